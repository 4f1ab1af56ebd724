pub mod authority;
pub mod certify;
pub mod error;
pub mod files;
pub mod issuers;

pub use authority::{
    Authority,
    IssuedCertificate,
};
pub use certify::certify;
pub use error::Error;
pub use issuers::{
    IssueContext,
    Issuer,
};
