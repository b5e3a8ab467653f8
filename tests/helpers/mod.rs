pub mod builders;
pub mod db;
pub mod verifier;

pub use builders::{InfoMatBuilder, PrincipalBuilder};
pub use db::TestDb;
pub use verifier::StubVerifier;
