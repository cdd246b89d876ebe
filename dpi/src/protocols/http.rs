use crate::layer::{Field, Layer};
use crate::parser::ParserError;
use crate::protocols::{ProtocolData, ProtocolId};
use nom::IResult;
use nom::Parser;
use nom::bytes::complete::{tag, take_until};
use nom::sequence::terminated;
use strum_macros::{Display, EnumIter};

// HTTP/1.x Protocol
// RFC 9112: https://datatracker.ietf.org/doc/html/rfc9112

pub const CRLF: &str = "\r\n";
pub const LAYER_NAME: &str = "Hypertext Transfer Protocol";
pub const HEADERS_LAYER_NAME: &str = "Headers";

/// Cheap check of the leading bytes, run before the full parse.
///
/// Matches a known request method followed by a space, or an `HTTP/<digit>.<digit>` status line.
pub fn sniff(payload: &[u8]) -> bool {
    is_request_start(payload) || is_response_start(payload)
}

fn is_request_start(payload: &[u8]) -> bool {
    let token_end = match payload.iter().position(|byte| *byte == b' ') {
        Some(value) => value,
        None => return false,
    };

    std::str::from_utf8(&payload[..token_end])
        .ok()
        .and_then(|token| Method::try_from(token).ok())
        .is_some()
}

fn is_response_start(payload: &[u8]) -> bool {
    match payload.get(..8) {
        Some([b'H', b'T', b'T', b'P', b'/', major, b'.', minor]) => {
            major.is_ascii_digit() && minor.is_ascii_digit()
        },
        _ => false,
    }
}

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    let (rest, potential_starting_line) =
        terminated(take_until(CRLF), tag(CRLF)).parse(bytes)?;
    let starting_line = std::str::from_utf8(potential_starting_line)
        .map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;

    let (rest, http) = if is_response_start(potential_starting_line) {
        parse_response(rest, starting_line)
    } else {
        parse_request(rest, starting_line)
    }
    .map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;

    Ok((rest, ProtocolData::HTTP(http)))
}

pub fn parse_request<'a>(
    input: &'a [u8], starting_line: &str,
) -> IResult<&'a [u8], HTTP> {
    let mut starting_line_parts = starting_line.splitn(3, ' ');
    let method = starting_line_parts
        .next()
        .ok_or(ParserError::ErrorVerify.to_nom(input))?;
    Method::try_from(method).map_err(|err| err.to_nom(input))?;
    let target = starting_line_parts
        .next()
        .filter(|target| !target.is_empty())
        .ok_or(ParserError::ErrorVerify.to_nom(input))?;
    let version = starting_line_parts
        .next()
        .ok_or(ParserError::ErrorVerify.to_nom(input))?;

    let (rest, headers) = parse_headers(input)?;

    let protocol = HTTPRequest {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
        headers,
        body_length: rest.len(),
    };

    Ok((rest, HTTP::Request(protocol)))
}

pub fn parse_response<'a>(
    input: &'a [u8], starting_line: &str,
) -> IResult<&'a [u8], HTTP> {
    let mut starting_line_parts = starting_line.splitn(3, ' ');
    let version = starting_line_parts
        .next()
        .ok_or(ParserError::ErrorVerify.to_nom(input))?;
    let status_code = starting_line_parts
        .next()
        .ok_or(ParserError::ErrorVerify.to_nom(input))?
        .parse::<u16>()
        .map_err(|_| ParserError::ErrorVerify.to_nom(input))?;
    // The reason phrase may be omitted
    let reason_phrase = starting_line_parts.next().unwrap_or_default();

    let (rest, headers) = parse_headers(input)?;

    let protocol = HTTPResponse {
        version: version.to_string(),
        status_code,
        reason: reason_phrase.to_string(),
        headers,
        body_length: rest.len(),
    };

    Ok((rest, HTTP::Response(protocol)))
}

// Stops at the empty line, or at the end of a segment that cut the header block.
// A cut line is left in the rest.
fn parse_headers(input: &[u8]) -> IResult<&[u8], Vec<Header>> {
    let mut headers: Vec<Header> = Vec::new();
    let mut rest_buffer = input;

    while !rest_buffer.is_empty() {
        if let Some(rest) = rest_buffer.strip_prefix(CRLF.as_bytes()) {
            rest_buffer = rest;
            break;
        }

        let line: IResult<&[u8], &[u8]> =
            terminated(take_until(CRLF), tag(CRLF)).parse(rest_buffer);
        let (rest, header_bytes) = match line {
            Ok(value) => value,
            Err(_) => break,
        };
        let header_line = std::str::from_utf8(header_bytes)
            .map_err(|_| ParserError::ErrorVerify.to_nom(rest_buffer))?;
        let (key, value) = header_line
            .split_once(':')
            .ok_or(ParserError::ErrorVerify.to_nom(rest_buffer))?;
        headers.push((key.trim().to_string(), value.trim().to_string()));

        rest_buffer = rest;
    }

    Ok((rest_buffer, headers))
}

#[derive(Clone, Debug, PartialEq)]
pub enum HTTP {
    Request(HTTPRequest),
    Response(HTTPResponse),
}

pub type Header = (String, String);

#[derive(Clone, Debug, PartialEq)]
pub struct HTTPRequest {
    // As written on the wire, the token is matched case-insensitively
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Vec<Header>,
    pub body_length: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HTTPResponse {
    pub version: String,
    pub status_code: u16,
    pub reason: String,
    pub headers: Vec<Header>,
    pub body_length: usize,
}

impl HTTP {
    pub fn headers(&self) -> &[Header] {
        match self {
            HTTP::Request(request) => &request.headers,
            HTTP::Response(response) => &response.headers,
        }
    }

    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::HTTP.tag();
        let mut layer = Layer::new(LAYER_NAME);

        match self {
            HTTP::Request(request) => {
                layer.push(Field::new("Type", "Request", tag));
                layer.push(Field::new("Method", request.method.as_str(), tag));
                layer.push(Field::new("URL", request.target.as_str(), tag));
                layer.push(Field::new("Version", request.version.as_str(), tag));
            },
            HTTP::Response(response) => {
                layer.push(Field::new("Type", "Response", tag));
                layer.push(Field::new("Version", response.version.as_str(), tag));
                layer.push(Field::new("Status Code", response.status_code, tag));
                layer.push(Field::new("Reason", response.reason.as_str(), tag));
            },
        }

        let body_length = match self {
            HTTP::Request(request) => request.body_length,
            HTTP::Response(response) => response.body_length,
        };
        if body_length > 0 {
            layer.push(Field::new("Body Length", body_length, tag).describe("bytes"));
        }

        if !self.headers().is_empty() {
            let mut headers = Layer::new(HEADERS_LAYER_NAME);
            for (key, value) in self.headers() {
                headers.push(Field::new(key, value.as_str(), tag));
            }
            layer.nest(headers);
        }

        layer
    }

    pub fn summary(&self) -> String {
        match self {
            HTTP::Request(request) => format!("Request {} {}", request.method, request.target),
            HTTP::Response(response) => {
                format!("Response {} {}", response.status_code, response.reason)
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, PartialEq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    TRACE,
    PATCH,
    CONNECT,
}

impl TryFrom<&str> for Method {
    type Error = ParserError;
    fn try_from(method: &str) -> Result<Self, Self::Error> {
        let line = method.to_ascii_uppercase();
        let line = line.as_str();
        match line {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            "TRACE" => Ok(Method::TRACE),
            "PATCH" => Ok(Method::PATCH),
            "CONNECT" => Ok(Method::CONNECT),
            _ => Err(ParserError::ErrorVerify),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolParser;
    use crate::frame::{RawFrame, Timestamp};
    use crate::parser::tests::{decode_hex, layers, record};
    use strum::IntoEnumIterator;

    const REQUEST_FRAME: &str = "00 1F F3 3C E1 13 F8 1E DF E5 84 3A 08 00 45 00 02 09 C7 2A 40 00 40 06 2D 58 AC 10 0B 0C D8 22 B5 2D FC 45 00 50 E8 B7 30 BC EC B9 A3 7A 80 18 FF FF 1A 7E 00 00 01 01 08 0A 1A 7D 84 38 AA E7 7F C8 47 45 54 20 2F 20 48 54 54 50 2F 31 2E 31 0D 0A 48 6F 73 74 3A 20 73 6C 61 73 68 64 6F 74 2E 6F 72 67 0D 0A 55 73 65 72 2D 41 67 65 6E 74 3A 20 4D 6F 7A 69 6C 6C 61 2F 35 2E 30 20 28 4D 61 63 69 6E 74 6F 73 68 3B 20 55 3B 20 49 6E 74 65 6C 20 4D 61 63 20 4F 53 20 58 20 31 30 2E 36 3B 20 65 6E 2D 55 53 3B 20 72 76 3A 31 2E 39 2E 32 2E 36 29 20 47 65 63 6B 6F 2F 32 30 31 30 30 36 32 35 20 46 69 72 65 66 6F 78 2F 33 2E 36 2E 36 0D 0A 41 63 63 65 70 74 3A 20 74 65 78 74 2F 68 74 6D 6C 2C 61 70 70 6C 69 63 61 74 69 6F 6E 2F 78 68 74 6D 6C 2B 78 6D 6C 2C 61 70 70 6C 69 63 61 74 69 6F 6E 2F 78 6D 6C 3B 71 3D 30 2E 39 2C 2A 2F 2A 3B 71 3D 30 2E 38 0D 0A 41 63 63 65 70 74 2D 4C 61 6E 67 75 61 67 65 3A 20 65 6E 2D 75 73 2C 65 6E 3B 71 3D 30 2E 35 0D 0A 41 63 63 65 70 74 2D 45 6E 63 6F 64 69 6E 67 3A 20 67 7A 69 70 2C 64 65 66 6C 61 74 65 0D 0A 41 63 63 65 70 74 2D 43 68 61 72 73 65 74 3A 20 49 53 4F 2D 38 38 35 39 2D 31 2C 75 74 66 2D 38 3B 71 3D 30 2E 37 2C 2A 3B 71 3D 30 2E 37 0D 0A 4B 65 65 70 2D 41 6C 69 76 65 3A 20 31 31 35 0D 0A 43 6F 6E 6E 65 63 74 69 6F 6E 3A 20 6B 65 65 70 2D 61 6C 69 76 65 0D 0A 43 6F 6F 6B 69 65 3A 20 5F 5F 75 74 6D 61 3D 39 32 37 33 38 34 37 2E 31 38 36 38 36 30 35 31 37 36 2E 31 31 34 31 33 32 33 37 35 38 2E 31 31 35 31 30 33 39 38 38 34 2E 31 31 36 37 35 38 37 30 32 34 2E 34 0D 0A 43 61 63 68 65 2D 43 6F 6E 74 72 6F 6C 3A 20 6D 61 78 2D 61 67 65 3D 30 0D 0A 0D 0A";

    const RESPONSE_FRAME: &str = "00 21 70 61 E1 F8 00 90 7F 3E 02 D0 08 00 45 00 00 C0 1F BF 40 00 7E 06 7E 5D AC 10 80 A9 AC 10 85 51 1F 4E E6 8E ED 44 84 44 F8 AA 17 EB 50 19 FF FF 28 1F 00 00 48 54 54 50 2F 31 2E 31 20 32 30 30 20 4F 4B 0D 0A 44 61 74 65 3A 20 54 75 65 2C 20 32 36 20 46 65 62 20 32 30 31 33 20 32 31 3A 35 37 3A 30 35 20 47 4D 54 0D 0A 53 65 72 76 65 72 3A 20 41 70 61 63 68 65 0D 0A 43 6F 6E 6E 65 63 74 69 6F 6E 3A 20 63 6C 6F 73 65 0D 0A 43 6F 6E 74 65 6E 74 2D 4C 65 6E 67 74 68 3A 20 32 0D 0A 43 6F 6E 74 65 6E 74 2D 54 79 70 65 3A 20 61 70 70 6C 69 63 61 74 69 6F 6E 2F 78 2D 6D 73 64 6F 77 6E 6C 6F 61 64 0D 0A 0D 0A 4F 4B";

    #[test]
    fn test_http_request() {
        let frame = decode_hex(REQUEST_FRAME);
        let layers = layers(&frame);

        let actual_http = match layers[3].clone() {
            ProtocolData::HTTP(HTTP::Request(value)) => value,
            _ => panic!(),
        };

        let expected_http = HTTPRequest {
            method: "GET".to_string(),
            target: "/".to_string(),
            version: "HTTP/1.1".to_string(),
            headers: vec![
                ("Host".to_string(), "slashdot.org".to_string()),
                ("User-Agent".to_string(), "Mozilla/5.0 (Macintosh; U; Intel Mac OS X 10.6; en-US; rv:1.9.2.6) Gecko/20100625 Firefox/3.6.6".to_string()),
                ("Accept".to_string(), "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string()),
                ("Accept-Language".to_string(), "en-us,en;q=0.5".to_string()),
                ("Accept-Encoding".to_string(), "gzip,deflate".to_string()),
                ("Accept-Charset".to_string(), "ISO-8859-1,utf-8;q=0.7,*;q=0.7".to_string()),
                ("Keep-Alive".to_string(), "115".to_string()),
                ("Connection".to_string(), "keep-alive".to_string()),
                ("Cookie".to_string(), "__utma=9273847.1868605176.1141323758.1151039884.1167587024.4".to_string()),
                ("Cache-Control".to_string(), "max-age=0".to_string()),
            ],
            body_length: 0,
        };

        assert_eq!(actual_http, expected_http);
    }

    #[test]
    fn test_http_request_record() {
        let frame = decode_hex(REQUEST_FRAME);
        let record = record(&frame);

        assert_eq!(record.protocol, "HTTP");
        assert_eq!(record.info, "Request GET /");
        assert_eq!(record.source, "172.16.11.12:64581");
        assert_eq!(record.target, "216.34.181.45:80");

        let layer = record.layers.last().unwrap();
        assert_eq!(layer.name, "Hypertext Transfer Protocol");
        assert_eq!(layer.field("Method").unwrap().value.to_string(), "GET");
        assert_eq!(layer.field("URL").unwrap().value.to_string(), "/");
        assert!(layer.field("Body Length").is_none());

        let headers = layer.child("Headers").unwrap();
        assert_eq!(headers.fields.len(), 10);
        assert_eq!(headers.fields[0].name, "Host");
        assert_eq!(headers.fields[0].value.to_string(), "slashdot.org");
        assert_eq!(headers.fields[9].name, "Cache-Control");
    }

    #[test]
    fn test_http_response() {
        let frame = decode_hex(RESPONSE_FRAME);
        let record = record(&frame);

        assert_eq!(record.protocol, "HTTP");
        assert_eq!(record.info, "Response 200 OK");

        let layer = record.layers.last().unwrap();
        let names: Vec<&str> = layer.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Type", "Version", "Status Code", "Reason", "Body Length"]
        );
        assert_eq!(layer.field("Status Code").unwrap().value.to_string(), "200");
        assert_eq!(layer.field("Body Length").unwrap().value.to_string(), "2");
        assert_eq!(
            layer.child("Headers").unwrap().field("Content-Type").unwrap().value.to_string(),
            "application/x-msdownload"
        );
    }

    #[test]
    fn test_http_cut_header_block() {
        let payload = b"POST /api/upload HTTP/1.1\r\nHost: example.org\r\nContent-Ty";
        let (rest, data) = ProtocolId::HTTP.decode(payload).unwrap();

        match data {
            ProtocolData::HTTP(HTTP::Request(request)) => {
                assert_eq!(request.method, "POST");
                assert_eq!(request.target, "/api/upload");
                assert_eq!(
                    request.headers,
                    vec![("Host".to_string(), "example.org".to_string())]
                );
            },
            _ => panic!(),
        }
        assert_eq!(rest, b"Content-Ty");
    }

    #[test]
    fn test_http_in_truncated_capture() {
        // IP total length says 521 bytes, the capture kept 81
        let frame = decode_hex("00 1A 8C 10 AD 30 00 1E 68 51 4F A9 08 00 45 00 02 09 1C 46 40 00 40 06 00 00 C0 A8 00 67 5D B8 D8 22 C3 50 00 50 00 00 00 01 00 00 00 00 50 18 FF FF 00 00 00 00 47 45 54 20 2F 20 48 54 54 50 2F 31 2E 31 0D 0A 48 6F 73 74 3A 20 61 0D 0A 55 73");
        let raw = RawFrame {
            data: &frame,
            captured_length: frame.len(),
            truncated: true,
        };

        let mut parser = ProtocolParser::new();
        let record = parser.process(&raw, Timestamp::default()).unwrap();

        assert_eq!(record.protocol, "HTTP");
        assert_eq!(record.info, "Request GET /");
        assert_eq!(record.length, 81);
        assert_eq!(
            record.layers[0].field("Truncated").unwrap().value.to_string(),
            "true"
        );

        let layer = record.layers.last().unwrap();
        let headers = layer.child(HEADERS_LAYER_NAME).unwrap();
        assert_eq!(headers.fields.len(), 1);
        assert_eq!(headers.fields[0].name, "Host");
    }

    #[test]
    fn test_http_lowercase_method_kept() {
        let payload = b"get /index.html HTTP/1.0\r\n\r\n";
        assert!(sniff(payload));

        let (_, data) = ProtocolId::HTTP.decode(payload).unwrap();
        let layer = data.to_layer();
        assert_eq!(layer.field("Method").unwrap().value.to_string(), "get");
        assert_eq!(layer.field("URL").unwrap().value.to_string(), "/index.html");
        assert!(layer.child("Headers").is_none());
    }

    #[test]
    fn test_http_sniff() {
        for method in Method::iter() {
            let line = format!("{} / HTTP/1.1\r\n", method);
            assert!(sniff(line.as_bytes()), "{}", method);
        }

        assert!(sniff(b"HTTP/1.0 404 Not Found\r\n"));
        assert!(!sniff(b"HTTP/x.1 200 OK\r\n"));
        assert!(!sniff(b"GETTING / HTTP/1.1\r\n"));
        assert!(!sniff(b"SSH-2.0-OpenSSH_9.6\r\n"));
        assert!(!sniff(b""));
    }

    #[test]
    fn test_http_start_line_without_crlf_stays_tcp() {
        // "GET /" with no line end, the start line can't be confirmed
        let frame = decode_hex("00 21 70 61 E1 F8 00 90 7F 3E 02 D0 08 00 45 00 00 2D 1F BF 40 00 7E 06 7E 5D AC 10 80 A9 AC 10 85 51 E6 8E 00 50 ED 44 84 44 F8 AA 17 EB 50 18 FF FF 28 1F 00 00 47 45 54 20 2F");
        let record = record(&frame);

        assert_eq!(record.protocol, "TCP");
        assert_eq!(record.layers.len(), 4);
    }

    #[test]
    fn test_http_malformed_header_stays_tcp() {
        let payload = b"GET / HTTP/1.1\r\nno colon here\r\n\r\n";
        assert!(sniff(payload));
        assert!(ProtocolId::HTTP.decode(payload).is_err());
    }
}
