// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-cancellable chat streams.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use modelplug_core::types::ChatChunk;
use modelplug_core::{ChatStream, RuntimeError};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Wrap `stream` so it ends as soon as `token` is cancelled.
///
/// The inner stream is dropped at that point, which aborts the backend call
/// it drives. Cancelling one caller's token leaves other streams untouched.
pub fn stream_with_cancellation(stream: ChatStream, token: CancellationToken) -> ChatStream {
    Box::pin(Cancellable {
        inner: Some(stream),
        cancelled: Box::pin(token.cancelled_owned()),
    })
}

struct Cancellable {
    inner: Option<ChatStream>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl Stream for Cancellable {
    type Item = Result<ChatChunk, RuntimeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };
        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.inner = None;
            return Poll::Ready(None);
        }
        match inner.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
