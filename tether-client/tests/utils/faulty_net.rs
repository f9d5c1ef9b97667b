use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

type Accepted = Arc<Mutex<Vec<Instant>>>;

/// TCP forwarder in front of a relay. `cut` drops every forwarded
/// connection and stops listening; `restore` listens again on the same
/// address.
pub struct FlakyProxy {
    pub addr: SocketAddr,
    upstream: SocketAddr,
    listener: Option<JoinHandle<()>>,
    pipes: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accepted: Accepted,
}

impl FlakyProxy {
    pub async fn start(upstream: SocketAddr) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut proxy = Self {
            addr: listener.local_addr().unwrap(),
            upstream,
            listener: None,
            pipes: Arc::default(),
            accepted: Arc::default(),
        };
        proxy.listen(listener);
        proxy
    }

    pub fn cut(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        for pipe in self.pipes.lock().unwrap().drain(..) {
            pipe.abort();
        }
    }

    pub async fn restore(&mut self) {
        // The aborted accept loop releases the port asynchronously.
        let listener = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match TcpListener::bind(self.addr).await {
                    Ok(listener) => return listener,
                    Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
                }
            }
        })
        .await
        .expect("proxy port never freed");
        self.listen(listener);
    }

    /// When each client connection was accepted.
    pub fn accepted(&self) -> Vec<Instant> {
        self.accepted.lock().unwrap().clone()
    }

    fn listen(&mut self, listener: TcpListener) {
        let upstream = self.upstream;
        let pipes = self.pipes.clone();
        let accepted = self.accepted.clone();
        self.listener = Some(tokio::spawn(async move {
            while let Ok((mut inbound, _)) = listener.accept().await {
                accepted.lock().unwrap().push(Instant::now());
                let pipe = tokio::spawn(async move {
                    if let Ok(mut outbound) = TcpStream::connect(upstream).await {
                        let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                    }
                });
                pipes.lock().unwrap().push(pipe);
            }
        }));
    }
}

/// Completes every WebSocket handshake, then drops the socket at once.
pub async fn spawn_dropping_server() -> (SocketAddr, Accepted) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted: Accepted = Arc::default();
    let log = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            log.lock().unwrap().push(Instant::now());
            tokio::spawn(async move {
                let _ = tokio_tungstenite::accept_async(stream).await;
            });
        }
    });
    (addr, accepted)
}

/// Accepts TCP connections and never answers the WebSocket handshake.
pub async fn spawn_silent_server() -> (SocketAddr, Accepted) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted: Accepted = Arc::default();
    let log = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            log.lock().unwrap().push(Instant::now());
            held.push(stream);
        }
    });
    (addr, accepted)
}
