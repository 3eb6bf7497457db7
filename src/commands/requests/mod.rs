pub mod change_request_status_command;
pub mod submit_request_command;

pub use change_request_status_command::{ChangeRequestStatusCommand, StatusChange};
pub use submit_request_command::{CartLine, RequestDetail, SubmitRequestCommand};
