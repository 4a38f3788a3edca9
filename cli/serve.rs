use crate::{
	config::Config,
	train::{fit_booster, load_table},
	ServeArgs,
};
use anyhow::{ensure, Result};
use hyper::{
	body::HttpBody,
	header::{self, HeaderValue},
	service::{make_service_fn, service_fn},
	Body, Method, Request, Response, StatusCode,
};
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tracing::info;
use triage_dataframe::Table;
use triage_features::Preprocessor;
use triage_tree::Booster;

/// Number columns are not part of a prediction request, so they take this value.
const DEFAULT_NUMBER_VALUE: &str = "5";
/// Enum columns are not part of a prediction request, so they take this value.
const DEFAULT_ENUM_VALUE: &str = "unknown";
/// Larger request bodies are rejected with 413.
const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(serde::Deserialize)]
struct PredictRequest {
	illness_description: String,
}

#[derive(serde::Serialize)]
struct PredictResponse<'a> {
	main_diagnosis: &'a str,
}

pub fn serve(args: ServeArgs) -> Result<()> {
	let config = Config::from_path(args.config.as_deref())?;
	ensure!(
		!config.text_columns.is_empty(),
		"serving requires a text column to hold the illness description"
	);
	let table = load_table(&args.train, args.train_extra.as_deref(), &config.id_column)?;
	ensure!(table.n_rows() > 0, "no training rows after merging");
	info!(n_rows = table.n_rows(), "loaded training data");
	let preprocessor = Preprocessor::fit(&table, &config.preprocessor_options());
	let (features, labels) = preprocessor.transform(&table);
	let booster = fit_booster(&config, features.view(), labels.view());
	let context = Context {
		config,
		preprocessor,
		booster,
	};
	let runtime = tokio::runtime::Runtime::new()?;
	runtime.block_on(run(SocketAddr::new(args.host, args.port), context))?;
	Ok(())
}

struct Context {
	config: Config,
	preprocessor: Preprocessor,
	booster: Booster,
}

impl Context {
	/// Predict the label of the last target for an illness description.
	fn predict(&self, illness_description: &str) -> &str {
		let config = &self.config;
		let mut column_names = Vec::new();
		let mut row = Vec::new();
		for column_name in config.number_columns.iter() {
			column_names.push(column_name.clone());
			row.push(DEFAULT_NUMBER_VALUE.to_owned());
		}
		for column_name in config.enum_columns.iter() {
			column_names.push(column_name.clone());
			row.push(DEFAULT_ENUM_VALUE.to_owned());
		}
		if let Some(column_name) = config.text_columns.first() {
			column_names.push(column_name.clone());
			row.push(illness_description.to_owned());
		}
		let table = Table {
			column_names,
			rows: vec![row],
		};
		let features = self.preprocessor.transform_features(&table);
		let predictions = self.booster.predict(features.row(0));
		let target = self.preprocessor.targets().last();
		match (target, predictions.last()) {
			(Some(target), Some(prediction)) => target.encoder.decode(*prediction).unwrap_or(""),
			_ => "",
		}
	}
}

async fn run(addr: SocketAddr, context: Context) -> hyper::Result<()> {
	let context = Arc::new(context);
	let service = make_service_fn(|_| {
		let context = context.clone();
		async move {
			Ok::<_, Infallible>(service_fn(move |request| handle(context.clone(), request)))
		}
	});
	let server = hyper::Server::try_bind(&addr)?;
	info!(%addr, "serving predictions");
	server.serve(service).await
}

async fn handle(
	context: Arc<Context>,
	request: Request<Body>,
) -> Result<Response<Body>, Infallible> {
	let method = request.method().clone();
	let path = request.uri().path().to_owned();
	let response = match read_body(request.into_body()).await {
		Ok(Some(body)) => respond(&context, &method, &path, &body),
		Ok(None) => with_cors_headers(text_response(
			StatusCode::PAYLOAD_TOO_LARGE,
			format!("request body exceeds {} bytes", MAX_BODY_SIZE),
		)),
		Err(error) => with_cors_headers(text_response(
			StatusCode::BAD_REQUEST,
			error.to_string(),
		)),
	};
	info!(%method, %path, status = response.status().as_u16());
	Ok(response)
}

/// Read the whole body, or return `None` as soon as it is known to exceed `MAX_BODY_SIZE`.
async fn read_body(mut body: Body) -> hyper::Result<Option<Vec<u8>>> {
	if body.size_hint().lower() > MAX_BODY_SIZE as u64 {
		return Ok(None);
	}
	let mut bytes = Vec::new();
	while let Some(chunk) = body.data().await {
		let chunk = chunk?;
		if bytes.len() + chunk.len() > MAX_BODY_SIZE {
			return Ok(None);
		}
		bytes.extend_from_slice(&chunk);
	}
	Ok(Some(bytes))
}

fn respond(context: &Context, method: &Method, path: &str, body: &[u8]) -> Response<Body> {
	let response = if path != "/predict" {
		text_response(StatusCode::NOT_FOUND, "not found".to_owned())
	} else if method == Method::OPTIONS {
		Response::new(Body::empty())
	} else if method != Method::POST {
		text_response(
			StatusCode::METHOD_NOT_ALLOWED,
			"only POST is supported".to_owned(),
		)
	} else {
		match serde_json::from_slice::<PredictRequest>(body) {
			Ok(request) => {
				let main_diagnosis = context.predict(&request.illness_description);
				json_response(&PredictResponse { main_diagnosis })
			}
			Err(error) => text_response(
				StatusCode::BAD_REQUEST,
				format!("invalid request body: {}", error),
			),
		}
	};
	with_cors_headers(response)
}

fn with_cors_headers(mut response: Response<Body>) -> Response<Body> {
	let headers = response.headers_mut();
	headers.insert(
		header::ACCESS_CONTROL_ALLOW_ORIGIN,
		HeaderValue::from_static("*"),
	);
	headers.insert(
		header::ACCESS_CONTROL_ALLOW_METHODS,
		HeaderValue::from_static("POST, OPTIONS"),
	);
	headers.insert(
		header::ACCESS_CONTROL_ALLOW_HEADERS,
		HeaderValue::from_static("Content-Type"),
	);
	response
}

fn text_response(status: StatusCode, body: String) -> Response<Body> {
	let mut response = Response::new(Body::from(body));
	*response.status_mut() = status;
	response
}

fn json_response(value: &impl serde::Serialize) -> Response<Body> {
	match serde_json::to_vec(value) {
		Ok(json) => {
			let mut response = Response::new(Body::from(json));
			response.headers_mut().insert(
				header::CONTENT_TYPE,
				HeaderValue::from_static("application/json"),
			);
			response
		}
		Err(error) => text_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
	}
}

#[cfg(test)]
fn test_context() -> Context {
	// Only the prompt separates the diagnoses, so predictions depend on the illness description.
	let csv = "master_index,years of experience,county,prompt,clinician,ddx snomed
1,5,kiambu,high fever chills,Malaria,malaria
2,5,kiambu,cough,Pneumonia,pneumonia
3,5,kiambu,fever chills,Malaria,malaria
4,5,kiambu,cough pain,Pneumonia,pneumonia
";
	let config = Config {
		learning_rate: 0.5,
		min_examples_per_node: 1,
		n_rounds: 20,
		n_buckets: 10,
		enum_columns: vec!["county".to_owned()],
		target_columns: vec!["clinician".to_owned(), "ddx snomed".to_owned()],
		..Default::default()
	};
	let table = Table::from_csv(std::io::Cursor::new(csv)).unwrap();
	let preprocessor = Preprocessor::fit(&table, &config.preprocessor_options());
	let (features, labels) = preprocessor.transform(&table);
	let booster = fit_booster(&config, features.view(), labels.view());
	Context {
		config,
		preprocessor,
		booster,
	}
}

#[cfg(test)]
fn body_string(response: Response<Body>) -> String {
	let runtime = tokio::runtime::Runtime::new().unwrap();
	let body = runtime
		.block_on(hyper::body::to_bytes(response.into_body()))
		.unwrap();
	String::from_utf8(body.to_vec()).unwrap()
}

#[test]
fn test_predict() {
	let context = test_context();
	let body = br#"{ "illness_description": "fever and chills" }"#;
	let response = respond(&context, &Method::POST, "/predict", body);
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
	assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
	let body: serde_json::Value = serde_json::from_str(&body_string(response)).unwrap();
	assert_eq!(body["main_diagnosis"], "malaria");
	assert_eq!(context.predict("bad cough"), "pneumonia");
}

#[test]
fn test_preflight_and_errors() {
	let context = test_context();
	let response = respond(&context, &Method::OPTIONS, "/predict", b"");
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
		"POST, OPTIONS"
	);
	let response = respond(&context, &Method::GET, "/predict", b"");
	assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
	let response = respond(&context, &Method::POST, "/predict", b"{ not json");
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert!(body_string(response).starts_with("invalid request body"));
	let response = respond(&context, &Method::POST, "/", b"{}");
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_oversized_bodies_are_rejected() {
	let context = Arc::new(test_context());
	let runtime = tokio::runtime::Runtime::new().unwrap();
	let request = |body: Body| {
		Request::builder()
			.method(Method::POST)
			.uri("/predict")
			.body(body)
			.unwrap()
	};
	let response = runtime
		.block_on(handle(
			context.clone(),
			request(Body::from(vec![b' '; MAX_BODY_SIZE + 1])),
		))
		.unwrap();
	assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
	assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
	// A streamed body has no known length until it has been read.
	let (mut sender, body) = Body::channel();
	let response = runtime
		.block_on(async {
			tokio::spawn(async move {
				sender
					.send_data(vec![b' '; MAX_BODY_SIZE].into())
					.await
					.ok();
				sender.send_data(vec![b' '].into()).await.ok();
			});
			handle(context.clone(), request(body)).await
		})
		.unwrap();
	assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
	let body = br#"{ "illness_description": "fever and chills" }"#;
	let response = runtime
		.block_on(handle(context, request(Body::from(&body[..]))))
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
}
