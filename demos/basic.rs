//! Basic usage example for the rsal library.
//!
//! This example renders access log lines for a few simulated requests, shows
//! how header tokens are grouped, and plugs in a custom field and a filter.

use rsal::{
    AccessLog, AccessLogFormatter, FieldRegistry, Formatter, Headers, MemorySink,
    RegistryBuilder, RequestInfo, RequestRecord, UpstreamHost,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== rsal Basic Usage Example ===\n");

    // Example 1: The default format
    default_format_example()?;

    // Example 2: Header tokens
    header_example()?;

    // Example 3: Custom fields and filtering
    custom_field_example()?;

    Ok(())
}

fn sample_request() -> RequestRecord {
    RequestRecord::new()
        .with_start_time(SystemTime::now())
        .with_request_received_duration(Duration::from_micros(420))
        .with_response_received_duration(Duration::from_millis(18))
        .with_bytes_sent(612)
        .with_bytes_received(148)
        .with_protocol("HTTP1")
        .with_response_code(200)
        .with_duration(Duration::from_millis(19))
        .with_downstream_remote_address("192.168.1.100:52114".parse().unwrap())
        .with_upstream_host(UpstreamHost::new("backend-1"))
}

/// Example 1: Rendering with the built-in default format
fn default_format_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("1. Default Format");
    println!("-----------------");

    let formatter = AccessLogFormatter::new("")?;
    let line = formatter.format(&Headers::new(), &Headers::new(), &sample_request());

    println!("Line: {}", line);
    println!("\n");
    Ok(())
}

/// Example 2: Request and response headers in the line
fn header_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("2. Header Tokens");
    println!("----------------");

    // Header tokens always follow the request info fields
    let format = "%REQ.Host% %RESP.Content-Type% %RESPONSE_CODE% %REQ.X-Missing%";
    let formatter = AccessLogFormatter::new(format)?;

    let mut request_headers = Headers::new();
    request_headers.insert("Host".to_string(), "example.com".to_string());
    let mut response_headers = Headers::new();
    response_headers.insert("Content-Type".to_string(), "application/json".to_string());

    println!("Format: {}", format);
    println!(
        "Line:   {}",
        formatter.format(&request_headers, &response_headers, &sample_request())
    );
    println!("\n");
    Ok(())
}

/// Example 3: A custom registry field and a filter that drops successes
fn custom_field_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("3. Custom Fields and Filtering");
    println!("------------------------------");

    let registry: FieldRegistry = RegistryBuilder::with_defaults()
        .register("STATUS_CLASS", |info: &dyn RequestInfo| {
            format!("{}xx", info.response_code() / 100)
        })
        .build();
    let formatter = AccessLogFormatter::with_registry(
        "%STATUS_CLASS% %RESPONSE_CODE% %UPSTREAM_HOST_SELECTED%",
        Arc::new(registry),
    )?;

    let sink = Arc::new(MemorySink::new());
    let only_failures = |_: &Headers, info: &dyn RequestInfo| info.response_code() >= 400;
    let log = AccessLog::with_sink(sink.clone(), Some(Box::new(only_failures)), formatter);

    for code in [200, 404, 201, 503] {
        let info = sample_request().with_response_code(code);
        log.log(&Headers::new(), &Headers::new(), &info);
    }

    println!("Logged {} of 4 requests:", sink.len());
    for line in sink.lines() {
        println!("  {}", line);
    }
    println!();
    Ok(())
}
