// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkwire -- submit one document to an IPP printer, or check that a printer
// is ready.  Every failure kind maps to a distinct exit code so the calling
// job processor can tell scenarios apart without parsing output.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{debug, error};

use inkwire_core::{CheckConfig, JobTicket, OperationError, PrintConfig};
use inkwire_print::{
    HttpIppTransport, IppTransport, PrintClient, PrinterAttributeCache, ProcessingLog,
    StderrProcessingLog,
};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR_DEFAULT: u8 = 1;
const EXIT_HELP: u8 = 2;

/// Ticket and validation failures surface as the default print error.
const EXIT_PRINT_DEFAULT: u8 = 10;

/// Cached printer attributes stay valid this long.
const CACHE_EXPIRY: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "inkwire", version, about = "IPP print client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the job ticket JSON file.
    #[arg(long = "ticketPath", global = true, default_value = "")]
    ticket_path: String,

    /// Target printer URI (ipp:// or ipps://).
    #[arg(long = "printerURI", global = true, default_value = "")]
    printer_uri: String,

    /// Seconds to wait for the printer to become ready.
    #[arg(long = "printerReadyTimeoutSec", global = true, default_value_t = 600)]
    printer_ready_timeout_sec: u64,

    /// Minimum seconds between readiness probes.
    #[arg(long = "printerReadyDelaySec", global = true, default_value_t = 2)]
    printer_ready_delay_sec: u64,

    /// HTTP client request timeout in seconds.
    #[arg(long = "httpRequestTimeoutSec", global = true, default_value_t = 30)]
    http_request_timeout_sec: u64,

    /// HTTP connect timeout in seconds; 0 keeps the transport default.
    #[arg(long = "httpConnectTimeoutSec", global = true, default_value_t = 0)]
    http_connect_timeout_sec: u64,

    /// HTTP response header timeout in seconds; 0 keeps the transport default.
    #[arg(long = "httpResponseHeaderTimeoutSec", global = true, default_value_t = 0)]
    http_response_header_timeout_sec: u64,

    /// TLS handshake timeout in seconds; 0 keeps the transport default.
    #[arg(long = "httpTlsHandshakeTimeoutSec", global = true, default_value_t = 0)]
    http_tls_handshake_timeout_sec: u64,

    /// Enable the on-disk printer attribute cache.
    #[arg(long = "printerAttributeCacheEnabled", global = true, default_value_t = false)]
    printer_attribute_cache_enabled: bool,

    /// Directory the attribute cache lives under.
    #[arg(long = "printerAttributeCachePath", global = true, default_value = "")]
    printer_attribute_cache_path: String,

    /// Overall seconds allowed for the whole IPP command.
    #[arg(long = "ippCommandTimeout", global = true, default_value_t = 30)]
    ipp_command_timeout_sec: u64,

    /// Expected printer-device-id raw value.
    #[arg(long = "ippDeviceId", global = true, default_value = "")]
    ipp_device_id: String,

    /// Regex extracting the device serial number (capture group 2).
    #[arg(long = "ippDeviceIdSnRegex", global = true, default_value = "")]
    ipp_device_id_sn_regex: String,

    /// Max retries for Send-Document and Print-Job.
    #[arg(
        long = "ippMaxPrintJobSendDocumentRetryAttempts",
        global = true,
        default_value_t = 5
    )]
    ipp_max_send_retry_attempts: u32,

    /// Max attempts while the printer keeps answering HTTP 401.
    #[arg(long = "ippMaxUnauthorisedAttempts", global = true, default_value_t = 4)]
    ipp_max_unauthorised_attempts: u32,

    /// Max attempts to create a job with a valid job-id.
    #[arg(long = "maxCreateJobAttempts", global = true, default_value_t = 3)]
    max_create_job_attempts: u32,

    /// Preferred print operation; "print-job" forces one-phase submission.
    #[arg(long = "ippPrintOperation", global = true, default_value = "")]
    ipp_print_operation: String,

    /// Document to print; stdin when absent.
    #[arg(long = "ippPrintDoc", global = true, default_value = "")]
    ipp_print_doc: String,

    /// Max retries for get-attributes operations (clamped to at least 1).
    #[arg(long = "ippGetAttributeRetries", global = true, default_value_t = 5)]
    ipp_get_attribute_retries: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the printer answers and is ready to accept jobs.
    CheckPrinter,
    /// Submit a document and monitor the job to completion.
    PrintJob,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let started = Instant::now();

    let Some(command) = &cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(EXIT_HELP);
    };
    let command_name = match command {
        Command::CheckPrinter => "check-printer",
        Command::PrintJob => "print-job",
    };

    let report: Arc<dyn ProcessingLog> = Arc::new(StderrProcessingLog);

    let http_client = match build_http_client(&cli) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "failed to create http client");
            return ExitCode::from(EXIT_ERROR_DEFAULT);
        }
    };
    let transport: Arc<dyn IppTransport> = Arc::new(HttpIppTransport::new(http_client));

    // A broken cache never fails the command; run without one instead.
    let cache = if cli.printer_attribute_cache_enabled && !cli.printer_attribute_cache_path.is_empty()
    {
        match PrinterAttributeCache::new(CACHE_EXPIRY, &cli.printer_attribute_cache_path) {
            Ok(cache) => Some(Arc::new(cache)),
            Err(err) => {
                error!(error = %err, "failed to initialise printer attribute cache");
                None
            }
        }
    } else {
        None
    };

    let client = PrintClient::new(transport, Arc::clone(&report), cache);

    let result = match command {
        Command::CheckPrinter => run_check_printer(&cli, &client).await,
        Command::PrintJob => run_print_job(&cli, &client).await,
    };

    match result {
        Ok(()) => {
            report.log(command_name, 1, "command execution success", started.elapsed());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(code) => code,
    }
}

async fn run_check_printer(cli: &Cli, client: &PrintClient) -> Result<(), ExitCode> {
    debug!(device_id = %cli.ipp_device_id, sn_regex = %cli.ipp_device_id_sn_regex, "check-printer");

    let config = CheckConfig {
        get_attribute_retries: cli.ipp_get_attribute_retries,
        device_id: non_empty(&cli.ipp_device_id),
        device_id_sn_regex: non_empty(&cli.ipp_device_id_sn_regex),
        ..CheckConfig::default()
    };

    client
        .check_printer(&cli.printer_uri, &config)
        .await
        .map_err(|err| operation_failed("check-printer", err))
}

async fn run_print_job(cli: &Cli, client: &PrintClient) -> Result<(), ExitCode> {
    if cli.ticket_path.is_empty() || cli.printer_uri.is_empty() {
        error!("ticketPath or printerURI empty");
        return Err(ExitCode::from(EXIT_PRINT_DEFAULT));
    }

    let ticket = match JobTicket::load(&cli.ticket_path) {
        Ok(ticket) => ticket,
        Err(err) => {
            error!(ticket_path = %cli.ticket_path, error = %err, "failed to read ticket");
            return Err(ExitCode::from(EXIT_PRINT_DEFAULT));
        }
    };

    let document: Box<dyn std::io::Read + Send> = if cli.ipp_print_doc.is_empty() {
        Box::new(std::io::stdin())
    } else {
        match std::fs::File::open(&cli.ipp_print_doc) {
            Ok(file) => Box::new(file),
            Err(err) => {
                error!(path = %cli.ipp_print_doc, error = %err, "cannot open input file");
                return Err(ExitCode::from(EXIT_ERROR_DEFAULT));
            }
        }
    };

    let config = PrintConfig {
        printer_ready_timeout: Duration::from_secs(cli.printer_ready_timeout_sec),
        printer_ready_delay: Duration::from_secs(cli.printer_ready_delay_sec),
        print_deadline: Duration::from_secs(cli.ipp_command_timeout_sec),
        max_send_attempts: cli.ipp_max_send_retry_attempts,
        max_create_job_attempts: cli.max_create_job_attempts,
        max_unauthorised_attempts: cli.ipp_max_unauthorised_attempts,
        force_print_job: forces_print_job(&cli.ipp_print_operation),
        ..PrintConfig::default()
    };

    client
        .print_job(&ticket, &cli.printer_uri, document, &config)
        .await
        .map_err(|err| operation_failed("print-job", err))
}

fn operation_failed(command: &str, err: OperationError) -> ExitCode {
    error!(command, error = %err, "ipp command failed");
    ExitCode::from(err.kind.exit_code())
}

fn build_http_client(cli: &Cli) -> reqwest::Result<reqwest::Client> {
    // Printers routinely present self-signed certificates; verification
    // stays off, as the fielded transport always had it.
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(match cli.http_request_timeout_sec {
            0 => 30,
            secs => secs,
        }))
        .danger_accept_invalid_certs(true);

    // The TLS handshake happens inside connection setup, so its limit
    // folds into the connect timeout.
    let connect = cli
        .http_connect_timeout_sec
        .max(cli.http_tls_handshake_timeout_sec);
    if connect > 0 {
        builder = builder.connect_timeout(Duration::from_secs(connect));
    }
    if cli.http_response_header_timeout_sec > 0 {
        builder = builder.read_timeout(Duration::from_secs(cli.http_response_header_timeout_sec));
    }

    builder.build()
}

fn forces_print_job(operation: &str) -> bool {
    matches!(operation.trim_matches('"'), "print-job")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
