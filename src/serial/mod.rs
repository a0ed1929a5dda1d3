pub mod enumerator;
pub mod link;
#[cfg(test)]
pub(crate) mod mock;
pub mod prober;

pub use enumerator::{
    system_enumerator, ComPortEnumerator, DeviceDirEnumerator, PortEnumerator, StaticPortEnumerator,
};
pub use link::{ScaleLink, SerialLink};
pub use prober::{DeviceOpener, DeviceProber, SerialOpener};
