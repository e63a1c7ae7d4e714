//! Minimal tsu-upload example: a hyper server with one upload endpoint.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example upload
//!
//! Try:
//!   curl -X POST http://localhost:3000/upload?name=notes.txt --data-binary @notes.txt
//!   curl -i http://localhost:3000/upload      # 405, allow: POST
//!
//! The parser here is a stand-in: it spools the raw body into one temp file
//! and reads fields from the query string. A real one would decode
//! `multipart/form-data` with multer or similar.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};
use tsu_upload::handler::BoxFuture;
use tsu_upload::{
    BoxError, DiskFile, Fields, FormParser, ParsedForm, Request, Response, with_file_upload,
};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let upload = with_file_upload(SpoolParser::new(std::env::temp_dir()), store);

    let addr: SocketAddr = "127.0.0.1:3000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    let mut tasks = tokio::task::JoinSet::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutting down");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };
                let svc = upload.clone();
                tasks.spawn(async move {
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    Ok(())
}

// POST /upload
//
// The spooled file is deleted as soon as this returns; copy it first if you
// want to keep it.
async fn store(req: Request) -> Result<Response, BoxError> {
    let name = req.field("name").unwrap_or("unnamed");
    let Some(path) = req.file("body").and_then(|f| f.path()) else {
        return Ok(Response::text("nothing uploaded"));
    };
    let size = tokio::fs::metadata(path).await?.len();
    Ok(Response::text(format!("received {name}: {size} bytes\n")))
}

struct SpoolParser {
    dir: PathBuf,
    next: AtomicU64,
}

impl SpoolParser {
    fn new(dir: PathBuf) -> Self {
        Self { dir, next: AtomicU64::new(0) }
    }
}

impl SpoolParser {
    async fn spool(&self, req: &Request) -> Result<ParsedForm, BoxError> {
        let fields: Fields = req.uri().query().unwrap_or_default()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .collect();

        if req.body().is_empty() {
            return Ok(ParsedForm::new(fields, Vec::new()));
        }

        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("tsu-upload-{}-{n}", std::process::id()));
        tokio::fs::write(&path, req.body()).await?;

        let mut file = DiskFile::new("body", path);
        if let Some(content_type) = req.header("content-type") {
            file = file.with_content_type(content_type);
        }
        if let Some(name) = fields.text("name") {
            file = file.with_file_name(name);
        }
        Ok(ParsedForm::new(fields, vec![file.into_handle()]))
    }
}

impl FormParser for SpoolParser {
    fn parse<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<ParsedForm, BoxError>> {
        Box::pin(self.spool(req))
    }
}
