//! Async UDP-with-TCP-fallback exchange, the async counterpart of the
//! teacher's blocking `clients::UdpClient`/`clients::TcpClient` (spec.md
//! §4.8: "issues ... queries over UDP-with-TCP-fallback").

use crate::wire::Message;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

const RECV_BUF: usize = 4096;

/// Sends `query` to `server` over UDP, retrying over TCP if the UDP
/// reply came back truncated (`tc` set).
pub async fn exchange(server: SocketAddr, query: &Message) -> io::Result<Message> {
    let response = exchange_udp(server, query).await?;
    if response.tc {
        return exchange_tcp(server, query).await;
    }
    Ok(response)
}

async fn exchange_udp(server: SocketAddr, query: &Message) -> io::Result<Message> {
    let local: SocketAddr = if server.is_ipv6() {
        "[::]:0".parse().unwrap()
    } else {
        "0.0.0.0:0".parse().unwrap()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(server).await?;

    let req = query.to_vec()?;
    socket.send(&req).await?;

    let mut buf = [0u8; RECV_BUF];
    let len = socket.recv(&mut buf).await?;
    Message::from_slice(&buf[..len])
}

async fn exchange_tcp(server: SocketAddr, query: &Message) -> io::Result<Message> {
    let mut stream = TcpStream::connect(server).await?;

    let req = query.to_vec()?;
    let mut framed = Vec::with_capacity(req.len() + 2);
    framed.extend_from_slice(&(req.len() as u16).to_be_bytes());
    framed.extend_from_slice(&req);
    stream.write_all(&framed).await?;

    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Message::from_slice(&buf)
}

/// Resolves `exchange` against a deadline, treating a deadline miss the
/// same as any other transport error (spec.md §5: "on timeout the query
/// is counted as timeout and the worker proceeds").
pub async fn exchange_with_timeout(
    server: SocketAddr,
    query: &Message,
    timeout: Duration,
) -> io::Result<Message> {
    match tokio::time::timeout(timeout, exchange(server, query)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "query timed out")),
    }
}
