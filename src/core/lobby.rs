use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

/// Which end of the connection we are. The listening side is always Player 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// Host: bind the listener. Split from [`accept_opponent`] so the bound port is known.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");
    Ok(listener)
}

/// Host: accept exactly one opponent.
pub async fn accept_opponent(listener: &TcpListener) -> Result<TcpStream> {
    let (stream, peer) = listener.accept().await.context("failed to accept connection")?;
    stream.set_nodelay(true)?;
    info!(%peer, "opponent connected");
    Ok(stream)
}

/// Host: bind, announce, and wait for the opponent.
pub async fn host(addr: &str) -> Result<TcpStream> {
    let listener = bind(addr).await?;
    println!("Listening on {}", listener.local_addr()?);
    println!("Waiting for opponent to connect...");
    let stream = accept_opponent(&listener).await?;
    println!("Opponent connected from {}", stream.peer_addr()?);
    Ok(stream)
}

/// Guest: dial the host, giving up after `timeout`.
pub async fn join(addr: &str, timeout: Duration) -> Result<TcpStream> {
    println!("Connecting to {addr}...");
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| anyhow!("timed out connecting to {addr} after {timeout:?}"))?
        .with_context(|| format!("failed to connect to {addr}"))?;
    stream.set_nodelay(true)?;
    info!(peer = %stream.peer_addr()?, "connected to host");
    println!("Connected to host.");
    Ok(stream)
}
