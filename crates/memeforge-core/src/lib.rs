//! MemeForge Core Library
//!
//! Platform-agnostic scene model, undo/redo history and the publishing
//! collaborators (pinning, wallet, contract constants) of the meme editor.

pub mod config;
pub mod contract;
pub mod editor;
pub mod history;
pub mod pinning;
pub mod shapes;
pub mod share;
pub mod surface;
pub mod tools;
pub mod wallet;

pub use config::{AppConfig, ConfigError};
pub use contract::{ContractConstants, ContractError};
pub use editor::{Editor, EditorError, Notice, NoticeLevel};
pub use history::{HistoryConfig, HistoryError, HistoryManager, ReplayOutcome, Snapshot};
pub use pinning::{ContentId, MemoryPinning, NftMetadata, PinError, PinningService};
pub use share::ShareLinks;
pub use surface::{Surface, SurfaceDocument, SurfaceEvent};
pub use tools::ToolState;
pub use wallet::{
    Address, ConfirmationTracker, MemoryWallet, TransactionId, TxStatus, WalletBridge,
    WalletError, WalletEvent, WalletSession,
};

#[cfg(not(target_arch = "wasm32"))]
pub use pinning::PinataClient;

use std::future::Future;
use std::pin::Pin;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    pub fn block_on<F: std::future::Future>(f: F) -> F::Output {
        // Simple blocking executor for tests
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
                return result;
            }
        }
    }

    /// A solid PNG of the given size.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode test png");
        out.into_inner()
    }
}
