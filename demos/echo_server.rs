// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A load-balancing TCP echo server, grounded on `example/echo_server.cpp`:
//! one acceptor on thread 0 hands each new connection to the next worker in
//! round-robin order, and SIGINT stops the engine cleanly.

use ringcore::engine::Handle;
use ringcore::net::TcpAcceptor;
use ringcore::task::TaskBuilder;
use ringcore::types::ThreadId;
use ringcore::{Engine, EngineConfig};
use std::sync::mpsc;

const DEFAULT_THREAD: ThreadId = ThreadId::new(0);

fn main() {
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or_else(|| {
            eprintln!("usage: echo_server <port>");
            std::process::exit(1);
        });

    let engine = Engine::new(EngineConfig::default()).expect("failed to start engine");
    engine.start();
    let handle = engine.handle();

    handle
        .signal_handler()
        .handle(libc::SIGINT)
        .expect("failed to install SIGINT handler");
    let sigint = handle.signal_handler().subscribe(libc::SIGINT);

    let (stop_tx, stop_rx) = mpsc::channel();
    let _ = TaskBuilder::new()
        .name("sigint-watcher")
        .on_thread(DEFAULT_THREAD)
        .spawn(&handle, async move {
            sigint.next().await;
            tracing::info!("received SIGINT, stopping engine");
            let _ = stop_tx.send(());
        });

    let _ = TaskBuilder::new()
        .name("acceptor")
        .on_thread(DEFAULT_THREAD)
        .spawn(&handle, run_acceptor(handle.clone(), port));

    let _ = stop_rx.recv();
    engine.stop();
}

async fn run_acceptor(handle: Handle, port: u16) {
    let acceptor = TcpAcceptor::new(handle.clone(), DEFAULT_THREAD);
    if !acceptor.listen(libc::AF_INET, port, 10) {
        tracing::error!(error = acceptor.last_error(), "failed to bind listener");
        return;
    }
    tracing::info!(port, "accepting connections");

    let mut connection_count: usize = 0;
    while let Some(stream) = acceptor.accept().await {
        let worker = ThreadId::new((connection_count % handle.number_of_workers()) as u16);
        connection_count += 1;
        let id = connection_count;
        let _ = TaskBuilder::new()
            .name("connection")
            .on_thread(worker)
            .spawn(&handle, async move {
                tracing::debug!(connection = id, ?worker, "accepted");
                let mut buf = vec![0u8; 1028 * 1028];
                loop {
                    let n = stream.read_some(&mut buf).await;
                    if n <= 0 {
                        break;
                    }
                    stream.write(&buf[..n as usize]).await;
                }
                stream.shutdown().await;
                tracing::debug!(connection = id, "shut down");
            });
    }
    tracing::info!(error = acceptor.last_error(), "acceptor stopped");
}
