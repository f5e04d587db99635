mod common;

use common::{service, service_with, MemoryServer, PASSWORD};
use ftptools_ftp::ftp::*;
use secrecy::SecretString;
use std::time::{Duration, Instant};

fn request(id: &str) -> ConnectRequest {
    ConnectRequest {
        connection_id: id.to_string(),
        host: "ftp.example.com".into(),
        port: 21,
        username: "alice".into(),
        password: SecretString::new(PASSWORD.into()),
        passive: true,
        timeout_sec: None,
        make_active: false,
        initial_directory: None,
    }
}

fn status_of(svc: &FtpService, id: &str) -> ConnectionStatus {
    svc.list_connections()
        .into_iter()
        .find(|s| s.connection_id == id)
        .map(|s| s.status)
        .expect("session listed")
}

// ── Registry lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn unknown_identifier_fails_everywhere() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let kind = |r: FtpResult<()>| r.unwrap_err().kind;
    assert_eq!(
        svc.registry().get(Some("zz")).unwrap_err().kind,
        FtpErrorKind::UnknownConnection
    );
    assert_eq!(kind(svc.pwd(Some("zz")).await.map(|_| ())), FtpErrorKind::UnknownConnection);
    assert_eq!(
        kind(svc.change_directory(Some("zz"), "/").await.map(|_| ())),
        FtpErrorKind::UnknownConnection
    );
    assert_eq!(
        kind(svc.list_directory(Some("zz"), None, &ListOptions::default()).await.map(|_| ())),
        FtpErrorKind::UnknownConnection
    );
    assert_eq!(
        kind(svc.download_content(Some("zz"), "/x", None, TransferType::Binary).await.map(|_| ())),
        FtpErrorKind::UnknownConnection
    );
    assert_eq!(kind(svc.send_noop(Some("zz")).await.map(|_| ())), FtpErrorKind::UnknownConnection);
    assert_eq!(
        kind(svc.set_passive_mode(Some("zz"), false).await.map(|_| ())),
        FtpErrorKind::UnknownConnection
    );
    assert_eq!(
        kind(svc.switch_connection("zz").map(|_| ())),
        FtpErrorKind::UnknownConnection
    );
    assert_eq!(
        kind(svc.disconnect(Some("zz")).await.map(|_| ())),
        FtpErrorKind::UnknownConnection
    );
}

#[tokio::test]
async fn first_connection_stays_active_until_switch() {
    let server = MemoryServer::new();
    let svc = service(&server);

    let a = svc.connect(request("a")).await.unwrap();
    assert!(a.summary.active);
    assert_eq!(a.welcome.as_deref(), Some("220 Memory FTP ready"));

    let b = svc.connect(request("b")).await.unwrap();
    assert!(!b.summary.active);
    assert_eq!(svc.active_connection().as_deref(), Some("a"));

    let switched = svc.switch_connection("b").unwrap();
    assert!(switched.active);
    assert_eq!(svc.active_connection().as_deref(), Some("b"));

    let listed = svc.list_connections();
    let ids: Vec<_> = listed.iter().map(|s| s.connection_id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert!(!listed[0].active);
    assert!(listed[1].active);
}

#[tokio::test]
async fn make_active_takes_over() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    let mut req = request("b");
    req.make_active = true;
    svc.connect(req).await.unwrap();
    assert_eq!(svc.active_connection().as_deref(), Some("b"));
}

#[tokio::test]
async fn duplicate_and_failed_connects_leave_registry_clean() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let dup = svc.connect(request("a")).await.unwrap_err();
    assert_eq!(dup.kind, FtpErrorKind::DuplicateConnection);

    let mut bad = request("b");
    bad.password = SecretString::new("wrong-password".into());
    let err = svc.connect(bad).await.unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::AuthFailed);
    assert!(!err.message.contains("wrong-password"));
    assert_eq!(svc.list_connections().len(), 1);

    // The failed identifier is free again.
    svc.connect(request("b")).await.unwrap();
    assert_eq!(svc.list_connections().len(), 2);
}

#[tokio::test]
async fn unreachable_host_is_a_connect_error() {
    let server = MemoryServer::new();
    server.set_reachable(false);
    let svc = service(&server);
    let err = svc.connect(request("a")).await.unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::ConnectionFailed);
    assert!(svc.list_connections().is_empty());
    assert!(svc.active_connection().is_none());
}

#[tokio::test]
async fn session_limit_is_enforced() {
    let server = MemoryServer::new();
    let svc = service_with(
        &server,
        FtpServiceConfig {
            max_sessions: 1,
            ..Default::default()
        },
    );
    svc.connect(request("a")).await.unwrap();
    assert!(svc.connect(request("b")).await.is_err());
    svc.disconnect(Some("a")).await.unwrap();
    svc.connect(request("b")).await.unwrap();
}

#[tokio::test]
async fn removing_active_leaves_no_active_connection() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    svc.connect(request("b")).await.unwrap();

    let closed = svc.disconnect(None).await.unwrap();
    assert_eq!(closed, "a");
    assert_eq!(server.quits(), 1);
    assert!(svc.active_connection().is_none());

    let err = svc.pwd(None).await.unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::NoActiveConnection);
    assert_eq!(svc.disconnect(None).await.unwrap_err().kind, FtpErrorKind::NoActiveConnection);

    // Explicit identifiers still work.
    assert_eq!(svc.pwd(Some("b")).await.unwrap(), "/");

    svc.switch_connection("b").unwrap();
    assert_eq!(svc.pwd(None).await.unwrap(), "/");
}

#[tokio::test]
async fn shutdown_closes_everything_once() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    svc.connect(request("b")).await.unwrap();

    svc.shutdown().await;
    assert!(svc.list_connections().is_empty());
    assert!(svc.active_connection().is_none());
    assert_eq!(server.quits(), 2);

    svc.shutdown().await;
    assert_eq!(server.quits(), 2);
}

#[tokio::test]
async fn distinct_sessions_run_concurrently() {
    let server = MemoryServer::new();
    server.set_connect_delay(Duration::from_millis(300));
    let svc = service(&server);

    let started = Instant::now();
    let (a, b) = tokio::join!(svc.connect(request("a")), svc.connect(request("b")));
    a.unwrap();
    b.unwrap();
    assert!(
        started.elapsed() < Duration::from_millis(550),
        "connects ran one after the other: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn listing_does_not_wait_for_a_busy_session() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    svc.connect(request("b")).await.unwrap();

    // "a" goes stale and its next call sits in a slow reconnect.
    server.kill_sessions();
    server.set_connect_delay(Duration::from_millis(300));
    let busy = svc.pwd(Some("a"));
    let observe = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = Instant::now();
        let listed = svc.list_connections();
        (listed.len(), started.elapsed())
    };
    let (pwd, (count, waited)) = tokio::join!(busy, observe);
    assert_eq!(pwd.unwrap(), "/");
    assert_eq!(count, 2);
    assert!(waited < Duration::from_millis(100));
}

// ── Navigation ───────────────────────────────────────────────────────

#[tokio::test]
async fn change_directory_rejection_keeps_session_healthy() {
    let server = MemoryServer::new();
    server.add_dir("/pub");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    assert_eq!(svc.change_directory(None, "pub").await.unwrap(), "/pub");
    let err = svc.change_directory(None, "/missing").await.unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::NotFound);
    assert!(err.message.contains("No such file or directory"));
    assert_eq!(err.session_id.as_deref(), Some("a"));
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Authenticated);
    assert_eq!(svc.pwd(None).await.unwrap(), "/pub");
    assert_eq!(server.connects(), 1);
}

#[tokio::test]
async fn explore_never_moves_the_working_directory() {
    let server = MemoryServer::new();
    server.add_dir("/pub");
    server.add_dir("/pub/data");
    server.add_file("/pub/readme.txt", b"hi");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    svc.change_directory(None, "/pub").await.unwrap();

    let ok = svc.explore_directory(None, "data").await.unwrap();
    assert!(ok.accessible);
    assert_eq!(ok.directory, "/pub/data");
    assert_eq!(ok.original_directory, "/pub");
    assert!(ok.can_go_up);
    assert!(ok.parent_accessible);
    assert_eq!(svc.pwd(None).await.unwrap(), "/pub");

    let missing = svc.explore_directory(None, "/nowhere").await.unwrap();
    assert!(!missing.accessible);
    assert_eq!(missing.status, "not_found");
    assert_eq!(missing.message, "Directory does not exist");
    assert_eq!(svc.pwd(None).await.unwrap(), "/pub");

    let file = svc.explore_directory(None, "readme.txt").await.unwrap();
    assert_eq!(file.status, "not_a_directory");
    assert_eq!(svc.pwd(None).await.unwrap(), "/pub");

    let root = svc.explore_directory(None, "/").await.unwrap();
    assert!(root.accessible);
    assert!(!root.can_go_up);
    assert_eq!(svc.pwd(None).await.unwrap(), "/pub");
}

// ── Listing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_orders_filters_and_counts() {
    let server = MemoryServer::new();
    server.add_dir("/srv");
    server.add_dir("/srv/zeta");
    server.add_dir("/srv/Alpha");
    server.add_file("/srv/b.txt", b"bb");
    server.add_file("/srv/a.log", b"a");
    server.add_file("/srv/.hidden", b"h");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let all = svc
        .list_directory(None, Some("/srv"), &ListOptions::default())
        .await
        .unwrap();
    let names: Vec<_> = all.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "zeta", ".hidden", "a.log", "b.txt"]);
    assert_eq!(all.total_directories, 2);
    assert_eq!(all.total_files, 3);
    // Listing a path does not change directory.
    assert_eq!(all.current_directory, "/");

    let txt = svc
        .list_directory(
            None,
            Some("/srv"),
            &ListOptions {
                filter: Some("*.txt".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(txt.entries.len(), 1);
    assert_eq!(txt.entries[0].name, "b.txt");
    assert_eq!(txt.entries[0].size, 2);

    let visible = svc
        .list_directory(
            None,
            Some("/srv"),
            &ListOptions {
                show_hidden: false,
                sort_by: Some(FtpSortField::Size),
                sort_order: Some(FtpSortOrder::Desc),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(visible.entries.iter().all(|e| !e.name.starts_with('.')));
    assert_eq!(visible.entries[0].name, "b.txt");
}

#[tokio::test]
async fn invalid_glob_is_rejected_before_the_network() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    let err = svc
        .list_directory(
            None,
            None,
            &ListOptions {
                filter: Some("[".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::InvalidConfig);
}

// ── Entries ──────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_tree_tolerates_existing_ancestors() {
    let server = MemoryServer::new();
    server.add_dir("/a");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let report = svc.create_directory_tree(None, "/a/b/c").await.unwrap();
    assert_eq!(report.existing, ["/a"]);
    assert_eq!(report.created, ["/a/b", "/a/b/c"]);
    assert!(server.has_dir("/a/b/c"));

    let again = svc.create_directory_tree(None, "/a/b/c").await.unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.existing.len(), 3);
}

#[tokio::test]
async fn directory_tree_names_the_failing_segment() {
    let server = MemoryServer::new();
    server.add_file("/f.txt", b"x");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let err = svc.create_directory_tree(None, "/f.txt/sub/deeper").await.unwrap_err();
    assert!(err.message.contains("/f.txt/sub"), "{}", err.message);
    assert!(!server.has_dir("/f.txt/sub/deeper"));
}

#[tokio::test]
async fn entry_operations_surface_server_text() {
    let server = MemoryServer::new();
    server.add_file("/old.txt", b"data");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    assert_eq!(svc.make_directory(None, "docs").await.unwrap(), "/docs");
    let err = svc.make_directory(None, "docs").await.unwrap_err();
    assert!(err.message.contains("File exists"));

    svc.rename(None, "old.txt", "/docs/new.txt").await.unwrap();
    assert_eq!(server.file("/docs/new.txt").as_deref(), Some(&b"data"[..]));

    let err = svc.remove_directory(None, "/docs").await.unwrap_err();
    assert!(err.message.contains("Directory not empty"));

    svc.delete_file(None, "/docs/new.txt").await.unwrap();
    svc.remove_directory(None, "/docs").await.unwrap();
    assert!(!server.has_dir("/docs"));

    let err = svc.delete_file(None, "/docs/new.txt").await.unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::NotFound);
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Authenticated);
}

// ── Content transfers ────────────────────────────────────────────────

#[tokio::test]
async fn content_round_trips_text_and_binary() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let big: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("/empty.bin", Vec::new()),
        ("/hello.txt", "héllo wörld\n".as_bytes().to_vec()),
        ("/bytes.bin", vec![0, 159, 146, 150, 255, 13, 10]),
        ("/big.bin", big),
    ];
    for (path, data) in cases {
        let up = svc
            .upload_content(None, path, data.clone(), TransferType::Binary)
            .await
            .unwrap();
        assert_eq!(up.bytes, data.len() as u64);
        let down = svc
            .download_content(None, path, None, TransferType::Binary)
            .await
            .unwrap();
        assert_eq!(down.data, data, "{}", path);
    }
    assert_eq!(server.last_type(), Some(TransferType::Binary));
}

#[tokio::test]
async fn text_content_travels_as_ascii() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let up = svc
        .upload_content(None, "/notes.txt", b"line one\nline two\n".to_vec(), TransferType::Ascii)
        .await
        .unwrap();
    assert_eq!(up.transfer_type, TransferType::Ascii);
    assert_eq!(server.last_type(), Some(TransferType::Ascii));

    let down = svc
        .download_content(None, "/notes.txt", None, TransferType::Ascii)
        .await
        .unwrap();
    assert_eq!(down.data, b"line one\nline two\n");
}

#[tokio::test]
async fn content_ceiling_is_enforced() {
    let server = MemoryServer::new();
    server.add_file("/two-mb.bin", &vec![7u8; 2 * 1024 * 1024]);
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let err = svc
        .download_content(None, "/two-mb.bin", Some(1024 * 1024), TransferType::Binary)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::ContentTooLarge);

    // Without SIZE the stream itself trips the ceiling.
    server.disable_size_and_mdtm();
    let err = svc
        .download_content(None, "/two-mb.bin", Some(1024 * 1024), TransferType::Binary)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::ContentTooLarge);

    let summary = &svc.list_connections()[0];
    assert_eq!(summary.bytes_downloaded, 0);
    assert_eq!(summary.status, ConnectionStatus::Authenticated);
}

// ── Path transfers ───────────────────────────────────────────────────

#[tokio::test]
async fn path_transfers_use_default_names_and_create_parents() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let local = dir.path().join("report.csv");
    std::fs::write(&local, b"a,b\n1,2\n").unwrap();
    let up = svc
        .upload_file(None, local.to_str().unwrap(), None, false)
        .await
        .unwrap();
    assert_eq!(up.remote_path, "report.csv");
    assert_eq!(up.transfer_type, TransferType::Ascii);
    assert_eq!(server.file("/report.csv").as_deref(), Some(&b"a,b\n1,2\n"[..]));

    let target = dir.path().join("nested/deeper/copy.csv");
    let down = svc
        .download_file(None, "/report.csv", Some(target.to_str().unwrap()), true)
        .await
        .unwrap();
    assert_eq!(down.bytes, 8);
    assert_eq!(std::fs::read(&target).unwrap(), b"a,b\n1,2\n");

    let summary = &svc.list_connections()[0];
    assert_eq!(summary.bytes_uploaded, 8);
    assert_eq!(summary.bytes_downloaded, 8);
}

#[tokio::test]
async fn failed_download_removes_partial_file() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let target = dir.path().join("missing.bin");
    let err = svc
        .download_file(None, "/missing.bin", Some(target.to_str().unwrap()), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::NotFound);
    assert!(!target.exists());
}

#[tokio::test]
async fn upload_requires_a_regular_local_file() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("nope.txt");
    let err = svc
        .upload_file(None, missing.to_str().unwrap(), Some("/nope.txt"), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::IoError);

    let err = svc
        .upload_file(None, dir.path().to_str().unwrap(), Some("/dir"), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::InvalidConfig);
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Authenticated);
}

// ── Metadata ─────────────────────────────────────────────────────────

#[tokio::test]
async fn metadata_uses_commands_when_available() {
    let server = MemoryServer::new();
    server.add_file("/pub/blob.bin", &vec![0u8; 1_572_864]);
    server.add_dir("/pub");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let size = svc.file_size(None, "/pub/blob.bin").await.unwrap();
    assert_eq!(size.size, 1_572_864);
    assert_eq!(size.size_mb, 1.5);
    assert_eq!(size.source, MetadataSource::Command);

    let mtime = svc.modification_time(None, "/pub/blob.bin").await.unwrap();
    assert_eq!(mtime.raw_time, "20240315083000");
    assert_eq!(mtime.modification_time, "2024-03-15 08:30:00 UTC");
    assert_eq!(mtime.source, MetadataSource::Command);
}

#[tokio::test]
async fn metadata_falls_back_to_parent_listing() {
    let server = MemoryServer::new();
    server.add_dir("/pub");
    server.add_file("/pub/notes.txt", b"12345");
    server.disable_size_and_mdtm();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let size = svc.file_size(None, "/pub/notes.txt").await.unwrap();
    assert_eq!(size.size, 5);
    assert_eq!(size.source, MetadataSource::Listing);

    let mtime = svc.modification_time(None, "/pub/notes.txt").await.unwrap();
    assert_eq!(mtime.raw_time, "20240315083000");
    assert_eq!(mtime.source, MetadataSource::Listing);

    let err = svc.file_size(None, "/pub/absent.txt").await.unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::NotSupported);
}

// ── Health and reconnection ──────────────────────────────────────────

#[tokio::test]
async fn noop_failure_then_listing_reconnects() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    server.kill_sessions();
    let err = svc.send_noop(None).await.unwrap_err();
    assert!(err.is_connectivity());
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Stale);
    assert_eq!(server.connects(), 1);

    svc.list_directory(None, None, &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(server.connects(), 2);
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Authenticated);
}

#[tokio::test]
async fn noop_failure_then_listing_while_unreachable_is_connection_lost() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    server.set_reachable(false);
    svc.send_noop(None).await.unwrap_err();
    let err = svc
        .list_directory(None, None, &ListOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FtpErrorKind::ConnectionLost);
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Stale);

    // Recovers once the server is back.
    server.set_reachable(true);
    assert_eq!(svc.send_noop(None).await.unwrap(), "200 NOOP ok.");
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Authenticated);
}

#[tokio::test]
async fn dropped_connection_is_retried_transparently() {
    let server = MemoryServer::new();
    server.add_dir("/pub");
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();
    svc.change_directory(None, "/pub").await.unwrap();
    svc.set_passive_mode(None, false).await.unwrap();

    server.kill_sessions();
    assert_eq!(svc.pwd(None).await.unwrap(), "/pub");
    assert_eq!(server.connects(), 2);
    assert_eq!(server.last_initial_directory().as_deref(), Some("/pub"));
    assert_eq!(server.last_mode(), Some(DataChannelMode::Active));
    assert_eq!(status_of(&svc, "a"), ConnectionStatus::Authenticated);
}

#[tokio::test]
async fn passive_mode_toggle_reaches_the_transport() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let summary = svc.set_passive_mode(None, false).await.unwrap();
    assert!(!summary.passive);
    assert_eq!(server.last_mode(), Some(DataChannelMode::Active));

    let summary = svc.set_passive_mode(Some("a"), true).await.unwrap();
    assert!(summary.passive);
    assert_eq!(server.last_mode(), Some(DataChannelMode::Passive));
}

#[tokio::test]
async fn system_info_reports_server_details() {
    let server = MemoryServer::new();
    let svc = service(&server);
    svc.connect(request("a")).await.unwrap();

    let info = svc.system_info(None).await.unwrap();
    assert_eq!(info.system.as_deref(), Some("215 UNIX Type: L8"));
    assert!(info.features.unwrap_or_default().contains("SIZE"));
    assert_eq!(info.welcome.as_deref(), Some("220 Memory FTP ready"));
}
