//! SerialTransport trait and the OS-backed implementation.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};

use arcade_core::SerialPortCandidate;

/// Port enumeration and opening. Enables mock injection for testing.
///
/// `list_ports` may block and is run on the blocking pool by callers.
/// `open` must be called from within a tokio runtime.
pub trait SerialTransport: Send + Sync + 'static {
    type Port: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    fn list_ports(&self) -> io::Result<Vec<SerialPortCandidate>>;

    fn open(&self, path: &str, baud_rate: u32) -> io::Result<Self::Port>;
}

/// Real serial ports via `tokio-serial`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerial;

impl SerialTransport for SystemSerial {
    type Port = SerialStream;

    fn list_ports(&self) -> io::Result<Vec<SerialPortCandidate>> {
        let ports = tokio_serial::available_ports().map_err(io::Error::from)?;
        Ok(ports
            .into_iter()
            .map(|info| {
                let mut candidate = SerialPortCandidate::new(info.port_name);
                if let SerialPortType::UsbPort(usb) = info.port_type {
                    candidate.vendor_id = Some(format!("{:04x}", usb.vid));
                    candidate.product_id = Some(format!("{:04x}", usb.pid));
                    candidate.manufacturer = usb.manufacturer;
                    candidate.friendly_name = usb.product;
                    candidate.pnp_id = usb.serial_number;
                }
                candidate
            })
            .collect())
    }

    fn open(&self, path: &str, baud_rate: u32) -> io::Result<Self::Port> {
        tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(io::Error::from)
    }
}
