//! Byte-level encoding and decoding of P2P-CI messages.

use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::ProtocolError;
use super::types::*;

/// Upper bound on the message head. A peer that sends more than this without a
/// blank line gets whatever was read so far, which then fails to decode.
const MAX_HEAD_LEN: usize = 64 * 1024;
/// Largest body `read_frame` will wait for. Requests of this protocol carry no
/// body, so a larger `Content-Length` is not read and the frame fails to decode.
const MAX_BODY_LEN: usize = 64 * 1024;
const READ_CHUNK: usize = 4096;

// --- Encoding ---

pub fn encode_request(request: &Request) -> Vec<u8> {
    let start_line = format!(
        "{} {} {}",
        request.method, request.resource, request.version
    );
    serialize(&start_line, &request.headers, &request.body)
}

pub fn encode_response(response: &Response) -> Vec<u8> {
    serialize(&response.status_line(), &response.headers, &response.body)
}

fn serialize(start_line: &str, headers: &Headers, body: &[u8]) -> Vec<u8> {
    let mut out = String::with_capacity(start_line.len() + 64);
    out.push_str(start_line);
    out.push_str(CRLF);
    for (name, value) in headers.iter() {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(CRLF);
    }
    out.push_str(CRLF);

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

// --- Decoding ---

pub fn decode_request(raw: &[u8]) -> Result<Request, ProtocolError> {
    let (head, body) = split_message(raw)?;
    let mut lines = head.split(CRLF);
    let start_line = lines.next().unwrap_or_default();

    let (method, resource, version) = parse_request_line(start_line)?;
    let headers = parse_header_lines(lines)?;

    if let Some(declared) = headers.get(HEADER_CONTENT_LENGTH) {
        let declared =
            declared
                .parse::<usize>()
                .map_err(|_| ProtocolError::InvalidNumericField {
                    field: HEADER_CONTENT_LENGTH,
                    value: declared.to_string(),
                })?;
        if body.len() < declared {
            return Err(ProtocolError::IncompleteMessage);
        }
    }

    Ok(Request {
        method,
        resource,
        version,
        headers,
        body: body.to_vec(),
    })
}

pub fn decode_response(raw: &[u8]) -> Result<Response, ProtocolError> {
    let (head, body) = split_message(raw)?;
    let mut lines = head.split(CRLF);
    let status_line = lines.next().unwrap_or_default();

    let (version, code, reason) = parse_status_line(status_line)?;
    let headers = parse_header_lines(lines)?;

    Ok(Response {
        version,
        code,
        reason,
        headers,
        body: body.to_vec(),
    })
}

fn find_terminator(raw: &[u8]) -> Option<usize> {
    raw.windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}

fn split_message(raw: &[u8]) -> Result<(&str, &[u8]), ProtocolError> {
    let boundary = find_terminator(raw).ok_or(ProtocolError::IncompleteMessage)?;
    let head =
        std::str::from_utf8(&raw[..boundary]).map_err(|_| ProtocolError::InvalidEncoding)?;
    Ok((head, &raw[boundary + HEAD_TERMINATOR.len()..]))
}

/// Splits the start line into method, resource and version.
///
/// Only the token count is checked here. A resource that is neither `RFC <n>` nor
/// `ALL` is kept as [`Resource::Other`] so the version is checked before it.
fn parse_request_line(line: &str) -> Result<(Method, Resource, String), ProtocolError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ProtocolError::MalformedStartLine(line.to_string()));
    }

    let method = Method::from_token(tokens[0]);
    let version = tokens[tokens.len() - 1].to_string();
    let resource = match &tokens[1..tokens.len() - 1] {
        ["RFC", number] => match number.parse() {
            Ok(id) => Resource::Rfc(id),
            Err(_) => Resource::Other(format!("RFC {}", number)),
        },
        ["ALL"] => Resource::All,
        other => Resource::Other(other.join(" ")),
    };

    Ok((method, resource, version))
}

fn parse_status_line(line: &str) -> Result<(String, u16, String), ProtocolError> {
    let mut parts = line.trim().splitn(3, ' ');
    let (Some(version), Some(code), Some(reason)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ProtocolError::MalformedStartLine(line.to_string()));
    };

    let code = code
        .parse::<u16>()
        .map_err(|_| ProtocolError::InvalidNumericField {
            field: "status code",
            value: code.to_string(),
        })?;

    Ok((version.to_string(), code, reason.trim().to_string()))
}

fn parse_header_lines<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> Result<Headers, ProtocolError> {
    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ProtocolError::MalformedHeader(line.to_string()));
        }
        headers.insert(name, value.trim());
    }
    Ok(headers)
}

/// Declared body length of a (possibly partial) message, if its head is
/// complete and carries a parseable `Content-Length`.
fn declared_body_len(raw: &[u8], boundary: usize) -> Option<usize> {
    let head = std::str::from_utf8(&raw[..boundary]).ok()?;
    head.split(CRLF).skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim() == HEADER_CONTENT_LENGTH {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

// --- Framing ---

/// Reads one complete message from `reader`.
///
/// Keeps reading until the head terminator arrives, then reads exactly the
/// number of body bytes announced by `Content-Length` (if any, and at most
/// [`MAX_BODY_LEN`]). Returns `Ok(None)` when the stream closes before sending
/// anything. A stream that closes mid-message, or a body that is declared but
/// not read, yields the bytes read so far; decoding them reports the problem.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let boundary = loop {
        if let Some(pos) = find_terminator(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEAD_LEN {
            return Ok(Some(buffer));
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(if buffer.is_empty() { None } else { Some(buffer) });
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let body_start = boundary + HEAD_TERMINATOR.len();
    let total = declared_body_len(&buffer, boundary)
        .filter(|expected| *expected <= MAX_BODY_LEN)
        .and_then(|expected| body_start.checked_add(expected));
    if let Some(total) = total {
        while buffer.len() < total {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
        buffer.truncate(total.min(buffer.len()));
    } else {
        buffer.truncate(body_start);
    }

    Ok(Some(buffer))
}
