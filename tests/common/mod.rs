//! In-process mock gateway for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use bancho_irc::Config;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

const RECV_DEADLINE: Duration = Duration::from_secs(5);

/// A TCP listener standing in for the gateway, on an ephemeral port.
pub struct MockGateway {
    listener: TcpListener,
}

impl MockGateway {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock gateway");
        Self { listener }
    }

    pub fn addr(&self) -> SocketAddr {
        self.listener.local_addr().expect("local addr")
    }

    pub async fn accept(&self) -> GatewayConn {
        let (stream, _) = self.listener.accept().await.expect("accept");
        GatewayConn::new(stream)
    }
}

/// One accepted client connection, with line-oriented helpers.
pub struct GatewayConn {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl GatewayConn {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer: write_half,
        }
    }

    /// Next line from the client, CR stripped. Panics after five seconds.
    pub async fn recv(&mut self) -> String {
        tokio::time::timeout(RECV_DEADLINE, self.lines.next_line())
            .await
            .expect("timed out waiting for a client line")
            .expect("read line")
            .expect("client closed unexpectedly")
            .trim_end_matches('\r')
            .to_owned()
    }

    /// Next line if one arrives within `wait`, else `None`.
    pub async fn try_recv(&mut self, wait: Duration) -> Option<String> {
        match tokio::time::timeout(wait, self.lines.next_line()).await {
            Ok(Ok(Some(line))) => Some(line.trim_end_matches('\r').to_owned()),
            _ => None,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write to client");
    }

    /// Drain the auth handshake, asserting the line order.
    pub async fn expect_auth(&mut self, username: &str) {
        let pass = self.recv().await;
        assert!(pass.starts_with("PASS "), "expected PASS first, got {pass:?}");
        let user = self.recv().await;
        assert!(
            user.starts_with(&format!("USER {username} ")),
            "expected USER second, got {user:?}"
        );
        let nick = self.recv().await;
        assert_eq!(nick, format!("NICK {username}"), "expected NICK third");
    }

    /// Send the welcome numeric that completes registration.
    pub async fn welcome(&mut self, username: &str) {
        self.send(&format!(":cho.ppy.sh 001 {username} :Welcome to the gateway"))
            .await;
    }
}

/// Config pointed at the mock gateway, with test-friendly timings.
pub fn test_config(addr: SocketAddr) -> Config {
    Config {
        host: addr.ip().to_string(),
        port: addr.port(),
        username: "tester".to_owned(),
        password: "token".to_owned(),
        reconnect: false,
        reconnect_delay_secs: 1,
        connect_timeout_secs: 5,
        idle_timeout_secs: 30,
        ..Config::default()
    }
}
