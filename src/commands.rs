//! Command execution.

use crate::config::{Config, OutputFormat};
use crate::{Commands, FrameKind};
use bytes::Bytes;
use colored::Colorize;
use rpcwire_protocol::{Decoder, Encoder, Request, Response};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Executes a command and returns the formatted output.
pub fn execute(cmd: Commands, config: &Config) -> Result<String, Box<dyn std::error::Error>> {
    let encoder = Encoder::new(config.codec.clone());

    match cmd {
        Commands::EncodeRequest {
            service,
            method,
            meta,
            codes,
            data,
            out,
        } => {
            let mut request = Request::new(codes.message_id, service, method)
                .with_codes(codes.version, codes.compressor, codes.serializer)
                .with_data(parse_bytes_arg(data.as_deref())?);
            for entry in &meta {
                let (key, value) = parse_meta(entry)?;
                request.meta.insert(key.to_string(), value.to_string());
            }
            request.compute_head_length();

            let frame = encoder.encode_request(&request)?;
            tracing::debug!(
                "encoded request {} ({} header + {} body bytes)",
                request.message_id,
                request.head_length,
                request.body_length
            );
            emit_frame(&frame, out.as_deref())
        }

        Commands::EncodeResponse {
            codes,
            error,
            data,
            out,
        } => {
            let response = Response::new(codes.message_id)
                .with_codes(codes.version, codes.compressor, codes.serializer)
                .with_error(parse_bytes_arg(error.as_deref())?)
                .with_data(parse_bytes_arg(data.as_deref())?);

            let frame = encoder.encode_response(&response)?;
            tracing::debug!(
                "encoded response {} ({} header + {} body bytes)",
                response.message_id,
                response.head_length,
                response.body_length
            );
            emit_frame(&frame, out.as_deref())
        }

        Commands::DecodeRequest { input } => {
            let buf = read_input(&input)?;
            let request = Request::decode_with(&buf, &config.codec)?;
            Ok(render_request(&request, config.output.format)?)
        }

        Commands::DecodeResponse { input } => {
            let buf = read_input(&input)?;
            let response = Response::decode_with(&buf, &config.codec)?;
            Ok(render_response(&response, config.output.format)?)
        }

        Commands::Split { input, kind } => {
            let buf = read_input(&input)?;
            split_stream(&buf, kind, config)
        }
    }
}

/// Feeds `buf` through the stream decoder and renders every whole frame.
fn split_stream(
    buf: &[u8],
    kind: FrameKind,
    config: &Config,
) -> Result<String, Box<dyn std::error::Error>> {
    let format = config.output.format;
    let mut decoder = Decoder::with_config(config.codec.clone());
    decoder.extend(buf);

    let mut rendered = Vec::new();
    loop {
        let frame = match kind {
            FrameKind::Request => decoder
                .decode_request()?
                .map(|r| render_request(&r, format))
                .transpose()?,
            FrameKind::Response => decoder
                .decode_response()?
                .map(|r| render_response(&r, format))
                .transpose()?,
        };
        match frame {
            Some(frame) => rendered.push(frame),
            None => break,
        }
    }

    tracing::debug!("split {} frames from {} bytes", rendered.len(), buf.len());
    if decoder.buffered() > 0 {
        tracing::warn!(
            "{} trailing bytes do not form a complete frame",
            decoder.buffered()
        );
    }

    Ok(match format {
        OutputFormat::Json => format!("[{}]", rendered.join(",")),
        OutputFormat::Text => rendered.join("\n\n"),
    })
}

fn emit_frame(frame: &[u8], out: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match out {
        Some(path) => {
            std::fs::write(path, frame)?;
            tracing::info!("wrote {} bytes to {}", frame.len(), path.display());
            Ok(format!(
                "{} {} bytes to {}",
                "Wrote".green(),
                frame.len(),
                path.display()
            ))
        }
        None => Ok(hex::encode(frame)),
    }
}

/// Splits a `key=value` argument.
fn parse_meta(arg: &str) -> Result<(&str, &str), Box<dyn std::error::Error>> {
    arg.split_once('=')
        .ok_or_else(|| format!("metadata '{}' is not in key=value form", arg).into())
}

/// Parses a payload argument: `@file`, `hex:<digits>`, or literal text.
fn parse_bytes_arg(arg: Option<&str>) -> Result<Bytes, Box<dyn std::error::Error>> {
    let Some(arg) = arg else {
        return Ok(Bytes::new());
    };
    if let Some(path) = arg.strip_prefix('@') {
        Ok(Bytes::from(std::fs::read(path)?))
    } else if let Some(digits) = arg.strip_prefix("hex:") {
        Ok(Bytes::from(hex::decode(digits.trim())?))
    } else {
        Ok(Bytes::copy_from_slice(arg.as_bytes()))
    }
}

/// Reads frame bytes from a file, stdin (`-`), or `hex:<digits>`.
fn read_input(input: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if let Some(digits) = input.strip_prefix("hex:") {
        return Ok(hex::decode(digits.trim())?);
    }
    if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read(input)?)
}

fn payload_text(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "(empty)".dimmed().to_string();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => format!("{:?}", text),
        Err(_) => format!("hex:{}", hex::encode(bytes)),
    }
}

fn sorted_meta(request: &Request) -> BTreeMap<&str, &str> {
    request
        .meta
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

fn render_request(request: &Request, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(request),
        OutputFormat::Text => {
            let mut output = format!(
                "{} #{} (version {}, compressor {}, serializer {})\n",
                "Request".bold(),
                request.message_id,
                request.version,
                request.compressor,
                request.serializer
            );
            output.push_str(&format!(
                "  call:   {}.{}\n",
                request.service_name.cyan(),
                request.method_name.cyan()
            ));
            for (key, value) in sorted_meta(request) {
                output.push_str(&format!("  meta:   {}={}\n", key.yellow(), value));
            }
            output.push_str(&format!(
                "  length: {} header + {} body\n",
                request.head_length, request.body_length
            ));
            output.push_str(&format!("  data:   {}", payload_text(&request.data)));
            Ok(output)
        }
    }
}

fn render_response(response: &Response, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(response),
        OutputFormat::Text => {
            let status = if response.is_error() {
                "error".red()
            } else {
                "ok".green()
            };
            let mut output = format!(
                "{} #{} [{}] (version {}, compressor {}, serializer {})\n",
                "Response".bold(),
                response.message_id,
                status,
                response.version,
                response.compressor,
                response.serializer
            );
            if response.is_error() {
                output.push_str(&format!("  error:  {}\n", payload_text(&response.error)));
            }
            output.push_str(&format!(
                "  length: {} header + {} body\n",
                response.head_length, response.body_length
            ));
            output.push_str(&format!("  data:   {}", payload_text(&response.data)));
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodeArgs;
    use serde_json::Value;
    use std::io::Write;

    fn codes(message_id: u32) -> CodeArgs {
        CodeArgs {
            message_id,
            ..Default::default()
        }
    }

    fn json_config() -> Config {
        let mut config = Config::default();
        config.output.format = OutputFormat::Json;
        config
    }

    fn encode_request_hex(meta: Vec<String>, data: Option<&str>) -> String {
        execute(
            Commands::EncodeRequest {
                service: "UserService".to_string(),
                method: "GetUser".to_string(),
                meta,
                codes: codes(7),
                data: data.map(str::to_string),
                out: None,
            },
            &Config::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_meta() {
        assert_eq!(parse_meta("trace-id=abc").unwrap(), ("trace-id", "abc"));
        // Only the first '=' splits
        assert_eq!(parse_meta("k=a=b").unwrap(), ("k", "a=b"));
        assert_eq!(parse_meta("empty=").unwrap(), ("empty", ""));
        assert!(parse_meta("novalue").is_err());
    }

    #[test]
    fn test_parse_bytes_arg() {
        assert!(parse_bytes_arg(None).unwrap().is_empty());
        assert_eq!(parse_bytes_arg(Some("hello")).unwrap().as_ref(), b"hello");
        assert_eq!(
            parse_bytes_arg(Some("hex:00ff")).unwrap().as_ref(),
            &[0x00u8, 0xff]
        );
        assert!(parse_bytes_arg(Some("hex:zz")).is_err());
    }

    #[test]
    fn test_parse_bytes_arg_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x01\x02payload").unwrap();

        let arg = format!("@{}", file.path().display());
        assert_eq!(
            parse_bytes_arg(Some(&arg)).unwrap().as_ref(),
            b"\x01\x02payload"
        );
    }

    #[test]
    fn test_encode_then_decode_request() {
        let hex = encode_request_hex(vec!["trace-id=abc".to_string()], Some("payload"));

        let output = execute(
            Commands::DecodeRequest {
                input: format!("hex:{}", hex),
            },
            &json_config(),
        )
        .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["message_id"], 7);
        assert_eq!(value["head_length"], 48);
        assert_eq!(value["service_name"], "UserService");
        assert_eq!(value["method_name"], "GetUser");
        assert_eq!(value["meta"]["trace-id"], "abc");
        assert_eq!(value["data"], hex::encode("payload"));

        let request: Request = serde_json::from_str(&output).unwrap();
        assert_eq!(request.data.as_ref(), b"payload");
        assert_eq!(request.meta["trace-id"], "abc");
    }

    #[test]
    fn test_encode_request_rejects_bad_meta() {
        let result = execute(
            Commands::EncodeRequest {
                service: "svc".to_string(),
                method: "m".to_string(),
                meta: vec!["key=line\nbreak".to_string()],
                codes: CodeArgs::default(),
                data: None,
                out: None,
            },
            &Config::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_response_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.bin");

        execute(
            Commands::EncodeResponse {
                codes: codes(3),
                error: Some("not found".to_string()),
                data: None,
                out: Some(path.clone()),
            },
            &Config::default(),
        )
        .unwrap();

        let output = execute(
            Commands::DecodeResponse {
                input: path.display().to_string(),
            },
            &json_config(),
        )
        .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["message_id"], 3);
        assert_eq!(value["head_length"], 24);
        assert_eq!(value["error"], hex::encode("not found"));
        assert_eq!(value["data"], "");
    }

    #[test]
    fn test_decode_text_output() {
        let hex = encode_request_hex(vec!["b=2".to_string(), "a=1".to_string()], None);
        let output = execute(
            Commands::DecodeRequest {
                input: format!("hex:{}", hex),
            },
            &Config::default(),
        )
        .unwrap();

        assert!(output.contains("UserService"));
        assert!(output.contains("GetUser"));
        assert_eq!(output.matches("meta:").count(), 2);
        // Metadata is listed in key order
        assert!(output.find("=1").unwrap() < output.find("=2").unwrap());
    }

    #[test]
    fn test_decode_truncated_input() {
        let hex = encode_request_hex(Vec::new(), Some("payload"));
        let result = execute(
            Commands::DecodeRequest {
                input: format!("hex:{}", &hex[..hex.len() - 4]),
            },
            &Config::default(),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_split_stream() {
        let mut stream = Vec::new();
        for id in 1..=3u32 {
            let response = Response::new(id).with_data(format!("r{}", id).into_bytes());
            stream.extend_from_slice(&response.encode().unwrap());
        }
        // Partial trailing frame
        stream.extend_from_slice(&[0, 0, 0]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&stream).unwrap();

        let output = execute(
            Commands::Split {
                input: file.path().display().to_string(),
                kind: FrameKind::Response,
            },
            &json_config(),
        )
        .unwrap();

        let value: Value = serde_json::from_str(&output).unwrap();
        let frames = value.as_array().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2]["message_id"], 3);
        assert_eq!(frames[2]["data"], hex::encode("r3"));
    }
}
