use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::Deserialize;

use markov_core::io::{list_datasets, resolve_data_dir, tokenize_text};
use markov_core::{ChainEdit, ChainModel, GenerationParams, PlaybackError, PlaybackHandle, Speed};

mod config;
mod sink;

use config::ServerConfig;
use sink::CsvDatasetSink;

/// Query parameters for the `/v1/params` endpoint
#[derive(Deserialize)]
struct ParamsQuery {
	starting_state: Option<String>,
	length_limit: Option<usize>,
	delimiter: Option<String>,
}

#[derive(Deserialize)]
struct DatasetQuery {
	name: Option<String>,
}

#[derive(Deserialize)]
struct SpeedQuery {
	speed: Speed,
}

struct SharedData {
	playback: PlaybackHandle,
	data_dir: String,
}

impl ParamsQuery {
	/// Builds generation parameters; an empty starting state means "random".
	fn to_params(&self) -> Result<GenerationParams, String> {
		let starting_state = self.starting_state.clone().filter(|s| !s.trim().is_empty());
		let length_limit = self.length_limit.unwrap_or(markov_core::model::params::DEFAULT_LENGTH_LIMIT);
		let delimiter = self.delimiter.as_deref().unwrap_or(markov_core::model::params::DEFAULT_DELIMITER);
		GenerationParams::new(starting_state, length_limit, delimiter).map_err(|e| e.to_string())
	}
}

fn driver_error(e: PlaybackError) -> HttpResponse {
	let message = e.to_string();
	match e {
		PlaybackError::Chain(_) => HttpResponse::BadRequest().body(message),
		PlaybackError::Closed => HttpResponse::ServiceUnavailable().body(message),
		PlaybackError::Build(_) => HttpResponse::InternalServerError().body(message),
	}
}

/// Lists `.txt` observation files available in the data folder.
#[get("/v1/datasets")]
async fn get_datasets(data: web::Data<SharedData>) -> impl Responder {
	match list_datasets(resolve_data_dir(&data.data_dir), "txt") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list datasets"),
	}
}

/// Builds the chain from `<data_dir>/<name>.txt` (or its `.bin` snapshot).
#[put("/v1/load_dataset")]
async fn put_dataset(data: web::Data<SharedData>, query: web::Query<DatasetQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing or empty dataset name"),
	};

	let path = resolve_data_dir(&data.data_dir).join(format!("{name}.txt"));
	let chain = match web::block(move || ChainModel::from_file(path)).await {
		Ok(Ok(chain)) => chain,
		Ok(Err(e)) => return HttpResponse::InternalServerError().body(format!("Failed to load dataset: {e}")),
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load dataset: {e}")),
	};

	let summary = format!("{} states, {} transitions", chain.state_count(), chain.transition_count());
	match data.playback.replace_chain(chain).await {
		Ok(()) => HttpResponse::Ok().body(summary),
		Err(e) => driver_error(e),
	}
}

/// Input feed: one observation per line, blank lines separate cases.
#[put("/v1/observations")]
async fn put_observations(data: web::Data<SharedData>, body: String) -> impl Responder {
	let observations = body.lines().map(|line| line.trim().to_owned()).collect();
	match data.playback.load_observations(observations).await {
		Ok(chain) => HttpResponse::Ok().json(chain.as_ref()),
		Err(e) => driver_error(e),
	}
}

/// Builds the chain from prose, one word per observation.
#[put("/v1/text")]
async fn put_text(data: web::Data<SharedData>, body: String) -> impl Responder {
	match data.playback.load_observations(tokenize_text(&body)).await {
		Ok(chain) => HttpResponse::Ok().json(chain.as_ref()),
		Err(e) => driver_error(e),
	}
}

#[get("/v1/chain")]
async fn get_chain(data: web::Data<SharedData>) -> impl Responder {
	match data.playback.chain().await {
		Ok(chain) => HttpResponse::Ok().json(chain.as_ref()),
		Err(e) => driver_error(e),
	}
}

/// Drawing-mode edit, e.g. `{"op": "set_transition", "from": "A", "to": "B", "weight": 0.5}`.
#[post("/v1/chain/edit")]
async fn post_edit(data: web::Data<SharedData>, edit: web::Json<ChainEdit>) -> impl Responder {
	match data.playback.edit_chain(edit.into_inner()).await {
		Ok(()) => HttpResponse::Ok().body("Chain updated"),
		Err(e) => driver_error(e),
	}
}

#[put("/v1/params")]
async fn put_params(data: web::Data<SharedData>, query: web::Query<ParamsQuery>) -> impl Responder {
	let params = match query.to_params() {
		Ok(params) => params,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	match data.playback.set_params(params).await {
		Ok(()) => HttpResponse::Ok().body("Parameters updated"),
		Err(e) => driver_error(e),
	}
}

#[put("/v1/speed")]
async fn put_speed(data: web::Data<SharedData>, query: web::Query<SpeedQuery>) -> impl Responder {
	match data.playback.set_speed(query.speed).await {
		Ok(()) => HttpResponse::Ok().body("Speed updated"),
		Err(e) => driver_error(e),
	}
}

/// Playback events: `play`, `pause`, `resume`, `step`, `cancel`.
///
/// Returns the resulting playback state.
#[post("/v1/playback/{action}")]
async fn post_playback(data: web::Data<SharedData>, action: web::Path<String>) -> impl Responder {
	let playback = &data.playback;
	let result = match action.as_str() {
		"play" => playback.play().await,
		"pause" => playback.pause().await,
		"resume" => playback.resume().await,
		"step" => playback.step().await,
		"cancel" => playback.cancel().await,
		other => return HttpResponse::NotFound().body(format!("Unknown playback action '{other}'")),
	};
	match result {
		Ok(state) => HttpResponse::Ok().json(state),
		Err(e) => driver_error(e),
	}
}

#[get("/v1/playback")]
async fn get_playback(data: web::Data<SharedData>) -> impl Responder {
	match data.playback.snapshot().await {
		Ok(snapshot) => HttpResponse::Ok().json(snapshot),
		Err(e) => driver_error(e),
	}
}

#[get("/v1/output")]
async fn get_output(data: web::Data<SharedData>) -> impl Responder {
	match data.playback.snapshot().await {
		Ok(snapshot) => HttpResponse::Ok().json(snapshot.history),
		Err(e) => driver_error(e),
	}
}

/// Plain-text export of the output history.
#[get("/v1/output/text")]
async fn get_output_text(data: web::Data<SharedData>) -> impl Responder {
	match data.playback.snapshot().await {
		Ok(snapshot) => HttpResponse::Ok().content_type("text/plain").body(snapshot.history.to_text()),
		Err(e) => driver_error(e),
	}
}

#[delete("/v1/output")]
async fn delete_output(data: web::Data<SharedData>) -> impl Responder {
	match data.playback.clear_output().await {
		Ok(true) => HttpResponse::Ok().body("Output cleared"),
		Ok(false) => HttpResponse::Conflict().body("Output can only be cleared while playback is ready"),
		Err(e) => driver_error(e),
	}
}

/// Main entry point for the server.
///
/// Loads the configuration, spawns the playback driver and starts an
/// Actix-web HTTP server exposing it.
///
/// # Notes
/// - The server binds to `host:port` from the configuration (127.0.0.1:5000 by default).
/// - Finished sequences are appended to `export_file`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let config: ServerConfig = match markov_core::config::load() {
		Ok(config) => config,
		Err(e) => {
			error!("{e}");
			return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
		}
	};

	let sink = Arc::new(CsvDatasetSink::new(config.export_file.clone()));
	let playback = markov_core::PlaybackDriver::spawn(config.playback.clone(), sink);
	let shared_data = web::Data::new(SharedData { playback, data_dir: config.data_dir.clone() });

	info!("Listening on {}:{}", config.host, config.port);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_datasets)
			.service(put_dataset)
			.service(put_observations)
			.service(put_text)
			.service(get_chain)
			.service(post_edit)
			.service(put_params)
			.service(put_speed)
			.service(post_playback)
			.service(get_playback)
			.service(get_output)
			.service(get_output_text)
			.service(delete_output)
	})
		.bind((config.host.as_str(), config.port))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn blank_starting_state_means_random() {
		let query = ParamsQuery { starting_state: Some(" ".into()), length_limit: Some(4), delimiter: None };
		let params = query.to_params().unwrap();
		assert_eq!(params.starting_state(), None);
		assert_eq!(params.length_limit(), 4);
	}

	#[test]
	fn zero_length_is_a_bad_request() {
		let query = ParamsQuery { starting_state: None, length_limit: Some(0), delimiter: None };
		assert!(query.to_params().is_err());
	}
}
