pub mod error;
pub mod geometry;
pub mod message;
pub mod stream;

pub use error::{ProtocolError, Result};
pub use geometry::{Bounds, Coordinate, ViewState};
pub use message::{AddressData, BridgeMessage, Marker};
pub use stream::{BridgeRead, BridgeWrite, DEFAULT_MAX_FRAME_SIZE};
