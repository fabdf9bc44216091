use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::Cursor,
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use quorum::{
    Consistency, QueryMessage,
    protocol::{Message, ProtocolTransport},
};

#[derive(Debug, Parser)]
#[command(version, about = "Inspect and produce raw CQL frames", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Decode every frame stored in a file
    Inspect {
        /// File holding back-to-back frames
        path: PathBuf,
    },
    /// Append a QUERY request frame to a file
    Query {
        /// Statement text
        text: String,
        /// File to append the frame to
        #[arg(short, long)]
        out: PathBuf,
        /// Consistency level name, e.g. ONE or LOCAL_QUORUM
        #[arg(short, long, default_value = "ONE")]
        consistency: Consistency,
        /// Stream id written in the frame header
        #[arg(short, long, default_value_t = 0)]
        stream: i8,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Action::Inspect { path } => inspect(path),
        Action::Query {
            text,
            out,
            consistency,
            stream,
        } => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .read(true)
                .open(out)?;
            let mut query = QueryMessage::new(text, consistency);
            let mut transport = ProtocolTransport::new(file);
            transport.write_message(stream, &mut query)?;
            println!("wrote {} byte body: {query}", query.size());
            Ok(())
        }
    }
}

fn inspect(path: PathBuf) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(path)?;
    let total = bytes.len() as u64;
    let mut transport = ProtocolTransport::new(Cursor::new(bytes));

    while transport.get_ref().position() < total {
        let (header, message) = transport.read_message()?;
        let direction = if header.is_response() { "<-" } else { "->" };
        println!(
            "{direction} stream {:>4} {:>6} bytes  {message}",
            header.stream, header.length
        );
    }

    Ok(())
}
