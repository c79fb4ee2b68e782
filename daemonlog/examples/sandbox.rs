use daemonlog::{FileSink, LoggerGuard, engine_config, init_global};

fn start_logging_service() -> Result<LoggerGuard<FileSink>, Box<dyn std::error::Error>> {
    let engine = engine_config()
        .with_thread_name("MainThread")
        .open("Engine.log")?;
    let guard = init_global(engine)?;
    #[cfg(debug_assertions)]
    log::info!("The file was created successfully!");
    Ok(guard)
}

fn main() {
    let guard = match start_logging_service() {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Critical Error!: Unable to start Logging service! ({err})");
            std::process::exit(-1);
        }
    };
    let handles: Vec<_> = (0..3)
        .map(|i| {
            let engine = std::sync::Arc::clone(guard.engine());
            std::thread::spawn(move || {
                engine.set_thread_name(&format!("Worker{i}"));
                log::debug!("worker {i} started");
                log::warn!("worker {i} done");
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    log::info!("The logger is shutting down!");
}
