use std::{
    io::{Cursor, Read as _},
    net::SocketAddr,
    sync::mpsc,
    thread,
};

use layercast::{
    Canvas, Compositor, CompositionRequest, HttpObjectStore, ImageLoader, ImageSource,
    LayercastError, ObjectStore, Overlay, Placement, PngBlob, Studio, StudioConfig,
};
use url::Url;

struct Captured {
    method: String,
    url: String,
    content_type: Option<String>,
    access: Option<String>,
    auth: Option<String>,
    body: Vec<u8>,
}

fn header(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

/// Serve exactly `n` requests with `respond`, reporting each one back over a channel.
fn serve(
    n: usize,
    respond: impl Fn(&str) -> tiny_http::ResponseBox + Send + 'static,
) -> (SocketAddr, mpsc::Receiver<Captured>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for _ in 0..n {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let mut body = Vec::new();
            request.as_reader().read_to_end(&mut body).unwrap();
            let captured = Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                content_type: header(&request, "Content-Type"),
                access: header(&request, "x-access"),
                auth: header(&request, "Authorization"),
                body,
            };
            let response = respond(&captured.url);
            let _ = tx.send(captured);
            let _ = request.respond(response);
        }
    });
    (addr, rx)
}

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn png_response(bytes: Vec<u8>) -> tiny_http::ResponseBox {
    tiny_http::Response::from_data(bytes)
        .with_header("Content-Type: image/png".parse::<tiny_http::Header>().unwrap())
        .boxed()
}

fn not_found() -> tiny_http::ResponseBox {
    tiny_http::Response::from_string("Not found")
        .with_status_code(404)
        .boxed()
}

fn json(body: &str) -> tiny_http::ResponseBox {
    tiny_http::Response::from_string(body)
        .with_header(
            "Content-Type: application/json"
                .parse::<tiny_http::Header>()
                .unwrap(),
        )
        .boxed()
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2)
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "layercast_http_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[tokio::test]
async fn remote_base_and_overlay_are_composited() {
    let (addr, rx) = serve(2, |path| match path {
        "/me.png" => png_response(png([0, 0, 255, 255])),
        "/arrow.png" => png_response(png([255, 0, 0, 255])),
        _ => not_found(),
    });
    let base = ImageSource::parse(&format!("http://{addr}/me.png")).unwrap();
    let arrow = ImageSource::parse(&format!("http://{addr}/arrow.png")).unwrap();

    let canvas = Canvas::new(100, 100).unwrap();
    let comp = Compositor::new(canvas, ImageLoader::new(temp_dir("unused")).unwrap());
    let overlay = Overlay::new(arrow, 1.0, Placement::Centered { width: 20.0, height: 20.0 }).unwrap();
    let surface = comp
        .render(&CompositionRequest::new(base, vec![overlay], canvas))
        .await
        .unwrap();

    assert!(close(surface.pixel(50, 50).unwrap(), [255, 0, 0, 255]));
    assert!(close(surface.pixel(5, 5).unwrap(), [0, 0, 255, 255]));

    let mut paths: Vec<String> = rx.try_iter().map(|c| c.url).collect();
    paths.sort();
    assert_eq!(paths, ["/arrow.png", "/me.png"]);
}

#[tokio::test]
async fn http_error_status_is_a_load_error() {
    let (addr, _rx) = serve(1, |_| not_found());
    let url = format!("http://{addr}/gone.png");
    let loader = ImageLoader::new(temp_dir("unused")).unwrap();

    let err = loader
        .load(&ImageSource::parse(&url).unwrap())
        .await
        .unwrap_err();
    match err {
        LayercastError::Load { source_ref, reason } => {
            assert_eq!(source_ref, url);
            assert!(reason.contains("404"), "{reason}");
        }
        other => panic!("expected load error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_puts_png_with_headers_and_reads_url() {
    let (addr, rx) = serve(1, |_| json(r#"{"url":"https://cdn.example.com/images/1-image.png"}"#));
    let endpoint = Url::parse(&format!("http://{addr}/store")).unwrap();
    let store = HttpObjectStore::new(endpoint, Some("tok".to_string())).unwrap();
    let blob = layercast::encode_png(
        layercast::Surface::new(Canvas::new(4, 4).unwrap()).unwrap().finish(),
    )
    .unwrap();

    let url = store.store("images/1-image.png", &blob).await.unwrap();
    assert_eq!(url.as_str(), "https://cdn.example.com/images/1-image.png");

    let req = rx.recv().unwrap();
    assert_eq!(req.method, "PUT");
    assert_eq!(req.url, "/store/images/1-image.png");
    assert_eq!(req.content_type.as_deref(), Some(PngBlob::MIME));
    assert_eq!(req.access.as_deref(), Some("public"));
    assert_eq!(req.auth.as_deref(), Some("Bearer tok"));
    assert_eq!(req.body, blob.as_bytes());
}

#[tokio::test]
async fn upload_without_url_fails() {
    let (addr, _rx) = serve(1, |_| json("{}"));
    let store =
        HttpObjectStore::new(Url::parse(&format!("http://{addr}/")).unwrap(), None).unwrap();
    let blob = layercast::encode_png(
        layercast::Surface::new(Canvas::new(2, 2).unwrap()).unwrap().finish(),
    )
    .unwrap();

    let err = store.store("images/2-image.png", &blob).await.unwrap_err();
    assert!(matches!(err, LayercastError::Upload(_)), "{err:?}");
    assert!(err.to_string().contains("no url"), "{err}");
}

#[tokio::test]
async fn publish_uploads_once_and_builds_share_links() {
    let assets = temp_dir("publish_assets");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("default.png"), png([0, 0, 255, 255])).unwrap();
    std::fs::write(assets.join("arrow.png"), png([255, 0, 0, 255])).unwrap();

    let (addr, rx) = serve(1, |_| json(r#"{"url":"https://cdn.example.com/x.png"}"#));
    let cfg = StudioConfig {
        assets_root: assets.clone(),
        canvas: Canvas::new(64, 64).unwrap(),
        ..StudioConfig::default()
    };
    let studio = Studio::new(cfg).unwrap();
    let store = HttpObjectStore::new(Url::parse(&format!("http://{addr}/")).unwrap(), None).unwrap();

    let published = studio.publish(&store).await.unwrap();
    assert!(published.key.starts_with("images/"));
    assert!(published.key.ends_with("-image.png"));
    assert_eq!(published.links.image.as_str(), "https://cdn.example.com/x.png");
    assert!(
        published
            .links
            .mint
            .as_str()
            .starts_with("https://zora.co/create/edition?image=")
    );
    assert!(
        published
            .links
            .post
            .as_str()
            .starts_with("https://warpcast.com/~/compose?")
    );

    let req = rx.recv().unwrap();
    assert_eq!(req.url, format!("/{}", published.key));
    assert_eq!(req.body.len(), published.bytes);
    assert!(rx.try_recv().is_err());
    assert!(!studio.is_busy());

    std::fs::remove_dir_all(&assets).ok();
}

#[tokio::test]
async fn slow_source_hits_load_timeout() {
    let (addr, _rx) = serve(1, |_| {
        thread::sleep(std::time::Duration::from_millis(500));
        png_response(png([0, 0, 0, 255]))
    });
    let url = format!("http://{addr}/slow.png");
    let loader = ImageLoader::new(temp_dir("unused"))
        .unwrap()
        .with_timeout(Some(std::time::Duration::from_millis(50)));

    let err = loader
        .load(&ImageSource::parse(&url).unwrap())
        .await
        .unwrap_err();
    match err {
        LayercastError::Load { source_ref, reason } => {
            assert_eq!(source_ref, url);
            assert!(reason.contains("timed out"), "{reason}");
        }
        other => panic!("expected load error, got {other:?}"),
    }
}

#[tokio::test]
async fn long_url_is_reported_in_full() {
    let (addr, _rx) = serve(1, |_| not_found());
    let url = format!("http://{addr}/{}/img.png", "a".repeat(100));
    let loader = ImageLoader::new(temp_dir("unused")).unwrap();

    let err = loader
        .load(&ImageSource::parse(&url).unwrap())
        .await
        .unwrap_err();
    assert!(
        matches!(&err, LayercastError::Load { source_ref, .. } if *source_ref == url),
        "{err:?}"
    );
}
