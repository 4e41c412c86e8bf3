use std::time::Duration;

use log::{debug, trace};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio::time;

use crate::message::{Envelope, Request, ResponseBody};
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Client for the Otii TCP server. Cheap to clone; all clones share one
/// socket, and a mutex around it keeps one request in flight at a time.
#[derive(Clone)]
pub struct Connection {
    inner: std::sync::Arc<Mutex<Inner>>,
}

struct Inner {
    stream: TcpStream,
    buffer: Vec<u8>,
    trans_id: u32,
}

impl Connection {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Connection> {
        let stream = TcpStream::connect(addr).await?;
        debug!("connected to {}", stream.peer_addr()?);

        let inner = Inner {
            stream,
            buffer: Vec::new(),
            trans_id: 0,
        };

        Ok(Connection {
            inner: std::sync::Arc::new(Mutex::new(inner)),
        })
    }

    /// Sends a request and waits for the matching response with the
    /// default timeout. An `error` message becomes `Error::Remote`.
    pub async fn send_and_receive(&self, request: Request) -> Result<ResponseBody> {
        self.send_and_receive_with_timeout(request, Some(DEFAULT_TIMEOUT))
            .await
    }

    /// Same as `send_and_receive`, with an explicit timeout. `None` blocks
    /// indefinitely, for commands operating over large quantities of data.
    pub async fn send_and_receive_with_timeout(
        &self,
        mut request: Request,
        timeout: Option<Duration>,
    ) -> Result<ResponseBody> {
        let mut inner = self.inner.lock().await;

        inner.trans_id += 1;
        request.trans_id = inner.trans_id.to_string();

        match timeout {
            Some(limit) => time::timeout(limit, inner.roundtrip(&request)).await?,
            None => inner.roundtrip(&request).await,
        }
    }
}

impl Inner {
    async fn roundtrip(&mut self, request: &Request) -> Result<ResponseBody> {
        let mut bytes = serde_json::to_vec(request)?;
        bytes.push(b'\n');

        self.stream.write_all(&bytes).await?;
        debug!("sent {} (trans_id {})", request.cmd, request.trans_id);

        loop {
            match self.read_envelope().await? {
                Envelope::Response(body) if body.matches(request) => {
                    trace!("received response for {}", body.cmd);
                    return Ok(body);
                }
                Envelope::Error(body)
                    if body.trans_id.is_none()
                        || body.trans_id.as_deref() == Some(request.trans_id.as_str()) =>
                {
                    debug!("received error: {body}");
                    return Err(Error::Remote(body));
                }
                Envelope::Response(body) => {
                    debug!("skipped response for another transaction: {}", body.cmd)
                }
                Envelope::Error(body) => debug!("skipped error for another transaction: {body}"),
                Envelope::Unknown => trace!("skipped unhandled message"),
            }
        }
    }

    /// Reads one JSON value off the stream. The server is free to split or
    /// coalesce messages, so bytes are buffered and parsed incrementally.
    async fn read_envelope(&mut self) -> Result<Envelope> {
        loop {
            let (envelope, consumed) = {
                let mut values = serde_json::Deserializer::from_slice(&self.buffer)
                    .into_iter::<Envelope>();

                match values.next() {
                    Some(Ok(envelope)) => (Some(envelope), values.byte_offset()),
                    Some(Err(err)) if err.is_eof() => (None, 0),
                    Some(Err(err)) => return Err(err.into()),
                    None => (None, 0),
                }
            };

            if let Some(envelope) = envelope {
                self.buffer.drain(..consumed);
                return Ok(envelope);
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(Error::Disconnected);
            }
        }
    }
}

impl ResponseBody {
    fn matches(&self, request: &Request) -> bool {
        match &self.trans_id {
            Some(trans_id) => *trans_id == request.trans_id,
            None => self.cmd == request.cmd,
        }
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::testing::serve;
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let (connection, mut requests) = serve(|_| {
            vec![json!({
                "type": "response",
                "cmd": "arc_get_main_voltage",
                "data": { "value": 3.3 },
            })]
        })
        .await;

        let request = Request::new("arc_get_main_voltage", json!({ "device_id": "A1" }));
        let response = connection.send_and_receive(request).await.unwrap();

        assert_eq!(response.cmd, "arc_get_main_voltage");
        assert_eq!(response.field::<f64>("value").unwrap(), 3.3);

        assert_eq!(
            requests.recv().await.unwrap(),
            json!({
                "type": "request",
                "cmd": "arc_get_main_voltage",
                "trans_id": "1",
                "data": { "device_id": "A1" },
            })
        );
    }

    #[tokio::test]
    async fn test_trans_id_increments() {
        let (connection, mut requests) = serve(|request| {
            vec![json!({
                "type": "response",
                "cmd": request["cmd"],
                "data": {},
            })]
        })
        .await;

        for expected in ["1", "2", "3"] {
            let request = Request::new("arc_commit", json!({ "device_id": "A1" }));
            connection.send_and_receive(request).await.unwrap();

            let seen = requests.recv().await.unwrap();
            assert_eq!(seen["trans_id"], json!(expected));
        }
    }

    #[tokio::test]
    async fn test_remote_error() {
        let (connection, _requests) = serve(|_| {
            vec![json!({
                "type": "error",
                "cmd": "arc_calibrate",
                "errorcode": "device_not_connected",
                "data": { "device_id": "A1" },
            })]
        })
        .await;

        let request = Request::new("arc_calibrate", json!({ "device_id": "A1" }));
        match connection.send_and_receive(request).await {
            Err(Error::Remote(body)) => {
                assert_eq!(body.cmd.as_deref(), Some("arc_calibrate"));
                assert_eq!(body.errorcode.as_deref(), Some("device_not_connected"));
                assert_eq!(body.data, json!({ "device_id": "A1" }));
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_skips_unrelated_messages() {
        let (connection, _requests) = serve(|_| {
            vec![
                json!({ "type": "information", "info": "otii server" }),
                json!({ "type": "progress", "progress": 50 }),
                json!({
                    "type": "response",
                    "cmd": "arc_get_main",
                    "data": { "value": true },
                }),
            ]
        })
        .await;

        let request = Request::new("arc_get_main", json!({ "device_id": "A1" }));
        let response = connection.send_and_receive(request).await.unwrap();

        assert!(response.field::<bool>("value").unwrap());
    }

    #[tokio::test]
    async fn test_timeout() {
        let (connection, _requests) = serve(|_| vec![]).await;

        let request = Request::new("arc_get_main", json!({ "device_id": "A1" }));
        let result = connection
            .send_and_receive_with_timeout(request, Some(Duration::from_millis(50)))
            .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_disconnected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let connection = Connection::connect(addr).await.unwrap();
        let request = Request::new("arc_get_main", json!({ "device_id": "A1" }));

        match connection.send_and_receive(request).await {
            Err(Error::Disconnected) => {}
            // Depending on timing the write itself may fail instead.
            Err(Error::Io(_)) => {}
            other => panic!("expected disconnect, got {other:?}"),
        }
    }
}
