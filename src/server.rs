use crate::{assets, config::Config, images, pocketbase::PocketBase};
use anyhow::{Context, Error, Result, bail};
use log::{error, info};
use serde_json::{Value, json};
use std::{
    io::{Cursor, Read},
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
    thread,
};
use tiny_http::{Header, Method, Request, Response, Server};

const COLLECTION: &str = "macky";

pub struct FloppaServer {
    config: Config,
    pocketbase: PocketBase,
    server: Server,
}

impl FloppaServer {
    pub fn bind(config: Config) -> Result<Self> {
        let pocketbase = PocketBase::new(&config.pocketbase_url)?;

        let Ok(server) = Server::http(SocketAddrV4::new(
            Ipv4Addr::new(0, 0, 0, 0),
            config.port,
        )) else {
            bail!("Could not create server");
        };

        Ok(Self {
            config,
            pocketbase,
            server,
        })
    }

    pub fn port(&self) -> u16 {
        self.server
            .server_addr()
            .to_ip()
            .map_or(self.config.port, |addr| addr.port())
    }

    pub fn run(self) -> Result<()> {
        info!("Server starting on :{}", self.port());

        let handler = Arc::new(self);

        loop {
            let request = handler.server.recv().context("could not accept request")?;
            let handler = Arc::clone(&handler);

            thread::spawn(move || {
                if let Err(error) = handler.handle(request) {
                    error!("Error while processing request: {error:#}");
                }
            });
        }
    }

    fn handle(&self, request: Request) -> Result<()> {
        info!("{} {}", request.method(), request.url());

        let path = request
            .url()
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();

        if *request.method() != Method::Get {
            return respond_json_error(request, 404, "not found");
        }

        match path.as_str() {
            "/floppapi" => self.local_image(request),
            "/macka" => self.remote_image(request),
            "/macka/count" => self.collection_count(request),
            "/" => match assets::index() {
                Ok(response) => Ok(request.respond(response)?),
                Err(error) => respond_json_error(request, 500, &format!("{error:#}")),
            },
            path if path.starts_with("/assets/") => match assets::asset(path) {
                Ok(response) => Ok(request.respond(response)?),
                Err(_) => respond_json_error(request, 404, "not found"),
            },
            _ => respond_json_error(request, 404, "not found"),
        }
    }

    fn local_image(&self, request: Request) -> Result<()> {
        let response = images::random_image(&self.config.image_dir)
            .and_then(|path| assets::file_response(&path))
            .and_then(with_no_cache);

        match response {
            Ok(response) => Ok(request.respond(response)?),
            Err(error) => respond_json_error(request, 500, &format!("{error:#}")),
        }
    }

    fn remote_image(&self, request: Request) -> Result<()> {
        let fetched = self.pocketbase.random_record(COLLECTION).and_then(|record| {
            let data = self.pocketbase.download(COLLECTION, &record)?;
            Ok((record, data))
        });

        match fetched {
            Ok((record, data)) => {
                // Update views in the background so the response is not blocked.
                self.pocketbase.bump_views_detached(COLLECTION, &record);

                let response = with_no_cache(
                    Response::from_data(data).with_header(header("content-type", "image/jpeg")?),
                )?;

                Ok(request.respond(response)?)
            }
            Err(error) => respond_json_error(request, 500, &format!("{error:#}")),
        }
    }

    fn collection_count(&self, request: Request) -> Result<()> {
        match self.pocketbase.count(COLLECTION) {
            Ok(count) => Ok(request.respond(json_response(&json!({ "count": count }), 200)?)?),
            Err(error) => respond_json_error(request, 500, &format!("{error:#}")),
        }
    }
}

fn header(field: &str, value: &str) -> Result<Header> {
    Header::from_bytes(field, value).map_err(|_| Error::msg("Could not create header"))
}

fn with_no_cache<R: Read>(response: Response<R>) -> Result<Response<R>> {
    Ok(response
        .with_header(header("cache-control", "no-cache, no-store, must-revalidate")?)
        .with_header(header("pragma", "no-cache")?)
        .with_header(header("expires", "0")?))
}

fn json_response(value: &Value, status: u16) -> Result<Response<Cursor<Vec<u8>>>> {
    Ok(Response::from_string(value.to_string())
        .with_header(header("content-type", "application/json")?)
        .with_status_code(status))
}

fn respond_json_error(request: Request, status: u16, message: &str) -> Result<()> {
    Ok(request.respond(json_response(&json!({ "error": message }), status)?)?)
}
