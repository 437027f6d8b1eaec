use aqueduct_http::{
    codec::{RequestDecoder, ResponseEncoder},
    connection::{HttpConnection, MessageAccumulator},
    handler::{controller_fn, BoxError, Channel},
    protocol::{Request, Response, ResponseFrame},
};
use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion};
use http::StatusCode;
use serde::Serialize;
use std::{
    hint::black_box,
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::{Decoder, Encoder};

// Mock IO for testing
#[derive(Clone)]
struct MockIO {
    read_data: Vec<u8>,
    write_data: Vec<u8>,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, write_data: Vec::new(), read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

#[derive(Serialize)]
struct Model {
    id: u32,
    name: &'static str,
}

fn bench_request_decoder(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(&request[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });
}

fn bench_accumulate_chunked(c: &mut Criterion) {
    let request = b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\nChecksum: 42\r\n\r\n";

    c.bench_function("decode_and_accumulate_chunked_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut accumulator = MessageAccumulator::new();
            let mut bytes = BytesMut::from(&request[..]);
            while let Some(event) = decoder.decode(&mut bytes).unwrap() {
                if let Some(request) = accumulator.accumulate(event).unwrap() {
                    black_box(request);
                    break;
                }
            }
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    c.bench_function("encode_json_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            let response = Response::json(StatusCode::OK, &Model { id: 1, name: "a" });
            let (head, body, _trailers) = response.into_parts();
            encoder.encode(ResponseFrame::Head(head, body.len() as u64), &mut bytes).unwrap();
            encoder.encode(ResponseFrame::Body(body), &mut bytes).unwrap();
            encoder.encode(ResponseFrame::End, &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_http_connection(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
    let channel = Channel::new(controller_fn(|_request: Request| async {
        Ok::<_, BoxError>(Response::text(StatusCode::OK, "Hello World!"))
    }));
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

    c.bench_function("process_simple_request", |b| {
        b.iter(|| {
            let mock_io = MockIO::new(request.to_vec());
            let (reader, writer) = (mock_io.clone(), mock_io);
            let connection = HttpConnection::new(reader, writer);
            black_box(runtime.block_on(connection.process(channel.dispatcher())).unwrap());
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_accumulate_chunked, bench_response_encoder, bench_http_connection);
criterion_main!(benches);
