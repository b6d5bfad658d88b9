//! detect-intent: 单次意图识别调用的命令行工具
//!
//! Usage:
//!   detect-intent --endpoint <addr> --project <id> [OPTIONS] <text>
//!   detect-intent --config <file.yaml> --project <id> [OPTIONS] <text>

use anyhow::{bail, Context};
use nlu_intent_client::config::KEYRING_SERVICE;
use nlu_intent_client::{
    CallError, Client, ClientConfig, Credentials, DetectIntentRequest, TransportKind,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!(
        r#"detect-intent: send one text query to an intent-detection service

USAGE:
    detect-intent [OPTIONS] <TEXT>

OPTIONS:
    --endpoint <addr>       host:port or URL of the service
    --config <file>         YAML configuration file (env NLU_* overrides apply)
    --project <id>          Project id (required)
    --session <id>          Session id (a fresh one is generated when omitted)
    --lang <tag>            BCP-47 language code [default: en]
    --secure                Use TLS
    --token <token>         Bearer token sent with the call
    --keyring <account>     Read the token from the OS keyring
    --root-cert <path>      PEM root certificate bundle
    --timeout-ms <n>        Call timeout in milliseconds
    --grpc-web              Use the gRPC-Web transport
    --metadata <key=value>  Extra call metadata (repeatable)
    --json                  Print the result as JSON
    -h, --help              Show this help message

ENVIRONMENT:
    NLU_ENDPOINT, NLU_SECURE, NLU_TOKEN, NLU_ROOT_CERT_PATH, NLU_TIMEOUT_MS, NLU_TRANSPORT
    RUST_LOG                Log filter [default: info]"#
    );
}

#[derive(Debug, Default)]
struct Args {
    endpoint: Option<String>,
    config: Option<String>,
    project: Option<String>,
    session: Option<String>,
    lang: Option<String>,
    secure: bool,
    token: Option<String>,
    keyring_account: Option<String>,
    root_cert: Option<String>,
    timeout_ms: Option<u64>,
    grpc_web: bool,
    json: bool,
    metadata: Vec<(String, String)>,
    text: Vec<String>,
}

fn parse_args(raw: &[String]) -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{name} requires a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--endpoint" => args.endpoint = Some(value("--endpoint")?),
            "--config" => args.config = Some(value("--config")?),
            "--project" => args.project = Some(value("--project")?),
            "--session" => args.session = Some(value("--session")?),
            "--lang" => args.lang = Some(value("--lang")?),
            "--token" => args.token = Some(value("--token")?),
            "--keyring" => args.keyring_account = Some(value("--keyring")?),
            "--root-cert" => args.root_cert = Some(value("--root-cert")?),
            "--timeout-ms" => {
                let raw = value("--timeout-ms")?;
                args.timeout_ms = Some(raw.parse().with_context(|| format!("invalid --timeout-ms '{raw}'"))?);
            }
            "--metadata" => {
                let raw = value("--metadata")?;
                let (key, val) = raw
                    .split_once('=')
                    .with_context(|| format!("--metadata expects key=value, got '{raw}'"))?;
                args.metadata.push((key.trim().to_string(), val.trim().to_string()));
            }
            "--secure" => args.secure = true,
            "--grpc-web" => args.grpc_web = true,
            "--json" => args.json = true,
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            text => args.text.push(text.to_string()),
        }
    }
    Ok(Some(args))
}

fn build_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match (&args.config, &args.endpoint) {
        (Some(path), _) => ClientConfig::from_yaml_file(path)
            .with_context(|| format!("loading {path}"))?,
        (None, Some(endpoint)) => ClientConfig::new(endpoint.clone()).apply_env_overrides()?,
        (None, None) => ClientConfig::from_env().context("no --endpoint, --config or NLU_ENDPOINT")?,
    };

    if let (Some(_), Some(endpoint)) = (&args.config, &args.endpoint) {
        config.endpoint = endpoint.clone();
    }
    if args.secure {
        config.secure = true;
    }
    if args.grpc_web {
        config.transport = TransportKind::GrpcWeb;
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }
    config.metadata.extend(args.metadata.iter().cloned());

    if args.token.is_some() || args.keyring_account.is_some() || args.root_cert.is_some() {
        let mut credentials = config.credentials.take().unwrap_or_default();
        if let Some(account) = &args.keyring_account {
            let stored = Credentials::from_keyring(KEYRING_SERVICE, account)?;
            if let Some(token) = stored.token_value() {
                credentials = credentials.with_token(token);
            }
        }
        if let Some(token) = &args.token {
            credentials = credentials.with_token(token.clone());
        }
        if let Some(path) = &args.root_cert {
            credentials = credentials.with_root_certificate_file(path)?;
        }
        config.credentials = Some(credentials);
    }

    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let project = args.project.clone().context("--project is required")?;
    if args.text.is_empty() {
        bail!("no query text given");
    }
    let session = args.session.clone().unwrap_or_else(|| {
        let id = DetectIntentRequest::new_session_id();
        info!(session = %id, "generated session id");
        id
    });

    let config = build_config(&args)?;
    let client = Client::connect(config)?;

    let request = DetectIntentRequest::new(
        project,
        session,
        args.text.join(" "),
        args.lang.clone().unwrap_or_else(|| "en".to_string()),
    );

    match client.detect_intent(&request).await {
        Ok(response) if args.json => {
            let out = serde_json::json!({
                "intent": response.intent_name,
                "confidence": response.confidence,
                "fulfillment": response.fulfillment_text,
                "response_id": response.response_id,
                "query_text": response.query_text,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(true)
        }
        Ok(response) => {
            println!("intent:      {}", response.intent_name);
            println!("confidence:  {:.3}", response.confidence);
            println!("fulfillment: {}", response.fulfillment_text);
            println!("response id: {}", response.response_id);
            Ok(true)
        }
        Err(err) if args.json => {
            let out = serde_json::json!({
                "error": err.to_string(),
                "status": err.status_code().map(|c| c.name()),
                "retryable": err.is_retryable(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(false)
        }
        Err(err) => {
            eprintln!("{err}");
            if let CallError::Remote { code, .. } = &err {
                eprintln!("(status {} / {})", code.number(), code);
            }
            if err.is_retryable() {
                eprintln!("(the failure looks transient; retrying may succeed)");
            }
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
