// Subsystem models
//
// Representative kernel API models built only from the generic transitions.
// Each model declares its resource classes as constants so scenarios and
// tests can name the cells and properties it tracks.

pub mod block;
pub mod dma;
pub mod lock;
pub mod module;
pub mod urb;

pub use block::{Gfp, BLK_REQUEST};
pub use dma::DMA_MAPPING;
pub use lock::{MUTEX, SPINLOCK};
pub use module::MODULE_REFCOUNT;
pub use urb::URB;
