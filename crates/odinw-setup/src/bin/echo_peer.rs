//! TCP echo peer for end-to-end runs: accepts one connection at a time and
//! sends every received byte straight back until the peer hangs up.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use clap::Parser;
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(about = "Echo every byte received back to the sender")]
struct Args {
    /// Address to listen on.
    #[arg(short = 's', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 25000)]
    port: u16,
}

fn main() -> std::io::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let listener = TcpListener::bind((args.host.as_str(), args.port))?;
    info!("listening on {}:{}", args.host, args.port);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(err) = echo(stream) {
                    warn!("connection error: {err}");
                }
            }
            Err(err) => warn!("accept failed: {err}"),
        }
    }
    Ok(())
}

fn echo(mut stream: TcpStream) -> std::io::Result<()> {
    let peer = stream.peer_addr()?;
    info!("{peer} connected, will echo everything received");
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        stream.write_all(&buf[..n])?;
    }
    info!("{peer} disconnected");
    Ok(())
}
