use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("failed to write report: {0}")]
    ReportWrite(#[from] std::io::Error),
}
