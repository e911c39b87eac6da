mod http1;

pub use http1::Http1Transport;

use crate::{ResponseInfo, Result};

/// The sink through which a channel emits its response.
///
/// Implementations serialize and frame bytes toward the peer; the
/// channel guarantees that [`commit`][Transport::commit] is called at
/// most once per response (interim 1xx responses excepted) and that
/// [`write`][Transport::write] is only called afterwards. All operations
/// block until the content is accepted.
pub trait Transport: Send + Sync {
    /// Serialize `info` as a response head, append `content`, and — if
    /// `complete` — finalize the response.
    fn commit(&self, info: &ResponseInfo, content: &[u8], complete: bool) -> Result<()>;

    /// Append further content after commit; if `complete`, finalize the
    /// response.
    fn write(&self, content: &[u8], complete: bool) -> Result<()>;

    /// The channel has finished its active phase. The transport may
    /// release per-request resources or begin reading the next request.
    fn channel_completed(&self);
}
