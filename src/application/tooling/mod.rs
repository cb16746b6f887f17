mod error;
mod interface;

pub use error::RemoteCallError;
pub use interface::{NullRemoteService, RemoteCapabilityInfo, RemoteResponse, RemoteServiceInterface};
