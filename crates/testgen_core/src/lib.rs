pub mod domain;
pub mod ports;

pub use domain::{
    File, FileRejection, NewFile, NewTestCase, NewTestPlan, NewUser, Priority, SourceDocument,
    TestCase, TestCaseFilter, TestCaseType, TestPlan, User,
};
pub use ports::{BlobStorage, DatabaseService, PortError, PortResult, TextGenerationService};
