use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::core::EvaluatorError;

type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<String, EvaluatorError>> + Send + 'a>>;

/// Text chunks produced by a background generation, in order.
pub struct CompletionStream<'a> {
    inner: ChunkStream<'a>,
}

impl<'a> CompletionStream<'a> {
    pub(crate) fn new(inner: ChunkStream<'a>) -> Self {
        Self { inner }
    }

    /// Collect the entire stream into a single `String`, stopping at the first error.
    pub async fn collect(mut self) -> Result<String, EvaluatorError> {
        let mut out = String::new();
        while let Some(chunk) = self.inner.next().await {
            out.push_str(&chunk?);
        }
        Ok(out)
    }

    /// Take up to `n` chunks from the stream.
    pub async fn take(mut self, n: usize) -> Result<Vec<String>, EvaluatorError> {
        let mut out = Vec::new();
        for _ in 0..n {
            match self.inner.next().await {
                Some(chunk) => out.push(chunk?),
                None => break,
            }
        }
        Ok(out)
    }
}

impl<'a> Stream for CompletionStream<'a> {
    type Item = Result<String, EvaluatorError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}
