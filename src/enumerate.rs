//! Lazy, paginated listing of the objects under a prefix.

use crate::backend::RegionClient;
use crate::error::{CcatError, Result};
use crate::location::ObjectRef;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Listing state carried between polls
struct ListState {
    client: Arc<dyn RegionClient>,
    bucket: String,
    prefix: String,
    buffered: VecDeque<ObjectRef>,
    continuation: Option<String>,
    pages: u64,
    finished: bool,
}

/// Enumerate every object of `bucket` whose key starts with `prefix`.
///
/// Pages are requested one at a time, in the order dictated by the backend's
/// continuation cursor, and objects are yielded in the order each page lists
/// them. Only the current page is held in memory. An empty `prefix` lists the
/// whole bucket.
///
/// A failed page fetch yields a single `CcatError::Enumeration` and ends the
/// stream; call `enumerate` again to restart from the beginning.
pub fn enumerate(
    client: Arc<dyn RegionClient>,
    bucket: impl Into<String>,
    prefix: impl Into<String>,
) -> BoxStream<'static, Result<ObjectRef>> {
    let state = ListState {
        client,
        bucket: bucket.into(),
        prefix: prefix.into(),
        buffered: VecDeque::new(),
        continuation: None,
        pages: 0,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(object) = st.buffered.pop_front() {
                return Some((Ok(object), st));
            }
            if st.finished {
                return None;
            }

            let result = st
                .client
                .list_page(&st.bucket, &st.prefix, st.continuation.as_deref())
                .await;
            st.pages += 1;

            match result {
                Ok(page) => {
                    debug!(
                        bucket = %st.bucket,
                        prefix = %st.prefix,
                        page = st.pages,
                        objects = page.objects.len(),
                        more = page.next_continuation.is_some(),
                        "listed page"
                    );
                    st.buffered.extend(page.objects);
                    st.continuation = page.next_continuation;
                    st.finished = st.continuation.is_none();
                }
                Err(err) => {
                    st.finished = true;
                    let err = match err {
                        e @ (CcatError::Enumeration { .. } | CcatError::Cancelled) => e,
                        other => {
                            CcatError::enumeration(st.bucket.clone(), st.prefix.clone(), other)
                        }
                    };
                    return Some((Err(err), st));
                }
            }
        }
    })
    .boxed()
}
