pub mod body;
pub mod event;
pub mod request;
pub mod response;
pub mod stream;

pub use self::{
    event::{BodyChunk, HeaderEvent, PhaseEvent},
    response::{BodyEdit, HeaderMutation, MutationResponse},
    stream::{Phase, StreamController},
};
