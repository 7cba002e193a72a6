// src/broker/server.rs
use crate::broker::protocol::{read_frame, write_frame, Request, Response};
use crate::broker::state_machine::BrokerStateMachine;
use crate::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

pub struct Server {
    listener: TcpListener,
    broker: Arc<BrokerStateMachine>,
}

// Handler for individual client connections
pub struct Handler {
    stream: TcpStream,
    broker: Arc<BrokerStateMachine>,
}

impl Server {
    pub async fn new(addr: &str, broker: Arc<BrokerStateMachine>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("Broker server bound to {}", listener.local_addr()?);
        Ok(Server { listener, broker })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(&self) -> Result<()> {
        log::info!("Broker server listening on {}", self.listener.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, client_addr)) => {
                    log::info!("Accepted new connection from: {}", client_addr);
                    let broker = Arc::clone(&self.broker);

                    tokio::spawn(async move {
                        let mut handler = Handler::new(stream, broker);
                        if let Err(e) = handler.handle_connection().await {
                            log::error!("Error handling connection from {}: {}", client_addr, e);
                        }
                        log::info!("Connection with {} closed.", client_addr);
                    });
                }
                Err(e) => {
                    // Accept errors are per-connection; keep listening.
                    log::error!("Failed to accept new connection: {}", e);
                }
            }
        }
    }
}

impl Handler {
    pub fn new(stream: TcpStream, broker: Arc<BrokerStateMachine>) -> Self {
        Handler { stream, broker }
    }

    pub async fn handle_connection(&mut self) -> Result<()> {
        while let Some(request) = read_frame::<_, Request>(&mut self.stream).await? {
            let response = match self.dispatch(request).await {
                Ok(response) => response,
                Err(e) => {
                    log::warn!("Request failed: {}", e);
                    Response::Error {
                        message: e.to_string(),
                    }
                }
            };
            write_frame(&mut self.stream, &response).await?;
        }
        log::debug!("Client closed connection (EOF).");
        Ok(())
    }

    // Storage calls do blocking file I/O, keep them off the reactor threads.
    async fn dispatch(&self, request: Request) -> Result<Response> {
        let broker = Arc::clone(&self.broker);
        tokio::task::spawn_blocking(move || match request {
            Request::Send {
                topic,
                queue,
                payload,
            } => broker
                .send(&topic, queue, payload)
                .map(|offset| Response::Sent { offset }),
            Request::Pull {
                topic,
                queue,
                offset,
                max_messages,
            } => broker
                .pull(&topic, queue, offset, max_messages as usize)
                .map(|records| Response::Messages { records }),
            Request::LastOffset { topic, queue } => broker
                .last_offset(&topic, queue)
                .map(|offset| Response::LastOffset { offset }),
        })
        .await
        .map_err(|e| Error::Internal(format!("request task failed: {}", e)))?
    }
}
