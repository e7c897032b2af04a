use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Method;
use std::io;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::errors::{Result, WebDAVError};

use super::connection::{cancellable, handle_response_code};
use super::options::{ReadStreamOptions, WriteStreamOptions};
use super::request::{RequestBody, RequestDescriptor};
use super::service::{check_partial_content, WebDAVService};

const STREAM_BUFFER: usize = 16;

/// Download stream; failures after creation arrive as `Err` items
pub type ReadStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

fn receiver_stream<T: Send + 'static>(rx: mpsc::Receiver<T>) -> impl Stream<Item = T> + Send {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
}

impl WebDAVService {
    /// Returns at once and fetches in a background task. Must be called
    /// inside a tokio runtime.
    pub fn create_read_stream(&self, path: &str, options: ReadStreamOptions) -> ReadStream {
        let (tx, rx) = mpsc::channel::<Result<Bytes>>(STREAM_BUFFER);
        let service = self.clone();
        let path = path.to_string();

        tokio::spawn(async move {
            let cancel = options.request.cancel.clone();
            let forward = async {
                let mut request = RequestDescriptor::new(Method::GET, service.url_for(&path)?);
                if let Some(range) = options.range {
                    request.headers.set("Range", range.header_value());
                }
                let response = handle_response_code(service.send(request, &options.request).await?)?;
                if options.range.is_some() {
                    check_partial_content(&response)?;
                }

                let mut body = response.into_stream();
                while let Some(chunk) = body.next().await {
                    if tx.send(chunk).await.is_err() {
                        debug!("Read stream for {} dropped by consumer", path);
                        break;
                    }
                }
                Ok::<(), WebDAVError>(())
            };

            if let Err(e) = cancellable(cancel.as_ref(), forward).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        Box::pin(receiver_stream(rx))
    }

    /// Returns a writer at once; the PUT runs in a background task fed by
    /// [`WriteStream::write`]. Must be called inside a tokio runtime.
    pub fn create_write_stream(&self, path: &str, options: WriteStreamOptions) -> WriteStream {
        let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(STREAM_BUFFER);
        let (done_tx, done_rx) = oneshot::channel();
        let service = self.clone();
        let path = path.to_string();

        tokio::spawn(async move {
            let upload = async {
                let mut request = RequestDescriptor::new(Method::PUT, service.url_for(&path)?)
                    .header("Content-Type", "application/octet-stream")
                    .body(RequestBody::stream(receiver_stream(rx)));
                if !options.overwrite {
                    request.headers.set("If-None-Match", "*");
                }
                handle_response_code(service.send(request, &options.request).await?)?;
                debug!("Write stream for {} completed", path);
                Ok::<(), WebDAVError>(())
            };
            let outcome = upload.await;
            if let Err(e) = &outcome {
                warn!("Write stream for {} failed: {}", path, e);
            }
            let _ = done_tx.send(outcome);
        });

        WriteStream {
            tx: Some(tx),
            done: done_rx,
        }
    }
}

/// Writable end of [`WebDAVService::create_write_stream`]
#[derive(Debug)]
pub struct WriteStream {
    tx: Option<mpsc::Sender<io::Result<Bytes>>>,
    done: oneshot::Receiver<Result<()>>,
}

impl WriteStream {
    /// Queues a chunk. Fails once the upload has ended, `finish` reports why.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(stream_closed());
        };
        if tx.send(Ok(chunk.into())).await.is_err() {
            self.tx = None;
            return Err(stream_closed());
        }
        Ok(())
    }

    /// Ends the body and waits for the server's answer
    pub async fn finish(mut self) -> Result<()> {
        self.tx = None;
        self.done.await.unwrap_or_else(|_| Err(stream_closed()))
    }
}

fn stream_closed() -> WebDAVError {
    WebDAVError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "Write stream closed"))
}
