use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use relay::{request::Request, resolver::sanitize};

fn request_parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse");

    let requests = [
        (
            "simple",
            b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: Test\r\n\r\n".as_slice(),
        ),
        (
            "reload_check",
            b"GET /__relay_check__?t=1700000000000 HTTP/1.1\r\nHost: localhost:8080\r\n\r\n"
                .as_slice(),
        ),
        (
            "browser",
            b"GET /docs/guide.html HTTP/1.1\r\n\
              Host: localhost:8080\r\n\
              User-Agent: Mozilla/5.0 (X11; Linux x86_64)\r\n\
              Accept: text/html,application/xhtml+xml\r\n\
              Accept-Language: en-US,en;q=0.9\r\n\
              Accept-Encoding: gzip, deflate, br\r\n\
              Connection: keep-alive\r\n\
              \r\n"
                .as_slice(),
        ),
    ];

    for (name, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), request, |b, request| {
            b.iter(|| {
                let _ = Request::try_from(black_box(request), 0).unwrap();
            });
        });
    }

    group.finish();
}

fn sanitize_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");

    let uris = [
        ("root", "/"),
        ("nested", "/assets/css/site.css?v=42"),
        ("encoded", "/%E4%B8%AD%E6%96%87/my%20notes.md"),
        ("traversal", "/docs/%2e%2e/%2e%2e/etc/passwd"),
    ];

    for (name, uri) in uris.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), uri, |b, uri| {
            b.iter(|| sanitize(black_box(uri)));
        });
    }

    group.finish();
}

criterion_group!(benches, request_parse_benchmark, sanitize_benchmark);
criterion_main!(benches);
