//! The HTTP/1.1 server.
//!
//! One Tokio task per connection. Requests on a connection are answered in
//! order until the client asks to close, sends something unreadable, or goes away.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::signal::ctrl_c;
use tracing::{debug, error, info};

use super::{Error, Handler, Request, Response, Router};
use crate::colors::MaybeColorize;
use crate::config::get_config;

pub struct Server {
    router: Arc<Router>,
}

impl Server {
    pub fn new(handlers: Vec<Handler>) -> Result<Self, Error> {
        Ok(Self {
            router: Arc::new(Router::new(handlers)?),
        })
    }

    /// Listen on `general.host:general.port` until Ctrl-C.
    pub async fn launch(self) -> Result<(), Error> {
        let general = &get_config().general;
        let listener = TcpListener::bind((general.host.as_str(), general.port)).await?;

        self.serve(listener).await
    }

    /// Accept connections from `listener` until Ctrl-C.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        self.router.log_routes();
        info!("{} listening on {}", "chat-backend".green(), listener.local_addr()?);

        loop {
            select! {
                _ = ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let router = Arc::clone(&self.router);
                        tokio::spawn(serve_connection(router, stream, peer));
                    }

                    Err(err) => error!("accept failed: {}", err),
                }
            }
        }
    }
}

async fn serve_connection(router: Arc<Router>, stream: TcpStream, peer: SocketAddr) {
    let mut stream = BufReader::new(BufWriter::new(stream));

    loop {
        let request = match Request::read(peer, &mut stream).await {
            Ok(request) => request,

            // The client hung up between requests.
            Err(Error::Io(_)) => break,

            Err(err) => {
                debug!("{} sent an unreadable request: {}", peer, err);
                let _ = write(&mut stream, &Response::problem(err.code()).close()).await;
                break;
            }
        };

        let started = Instant::now();
        let keep_alive = request.keep_alive();

        let (response, controller) = match router.find(request.path()) {
            Some((handler, id)) => {
                let request = request.clone().with_id(id);
                let controller = handler.controller();
                (controller.handle_internal(&request).await, controller.controller_name())
            }

            None => (Response::not_found(), "-"),
        };

        let response = if keep_alive { response } else { response.close() };
        log_request(&request, controller, &response, started);

        if let Err(err) = write(&mut stream, &response).await {
            debug!("{} write failed: {}", peer, err);
            break;
        }

        if !keep_alive {
            break;
        }
    }
}

async fn write(stream: &mut BufReader<BufWriter<TcpStream>>, response: &Response) -> Result<(), Error> {
    response.send(stream).await?;
    stream.flush().await?;
    Ok(())
}

fn log_request(request: &Request, controller: &str, response: &Response, started: Instant) {
    let status = response.status().to_string();
    let status = match response.status() {
        500..=599 => status.red(),
        400..=499 => status.yellow(),
        _ => status,
    };

    info!(
        "{} {} {} {} ({:.3} ms)",
        request.method().as_str().purple(),
        request.path().purple(),
        controller.green(),
        status,
        started.elapsed().as_secs_f64() * 1000.0,
    );
}
