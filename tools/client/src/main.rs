//! Test-harness client for the exchange
//!
//! Places, cancels, and requests book logs over the framed TCP
//! protocol, printing decoded reports as they arrive.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};
use types::ids::OrderId;
use types::order::{AssetType, OrderType, Side, Ticker};
use uuid::Uuid;
use wire::report::REPORT_HEADER_LEN;
use wire::{CancelOrderMessage, Message, NewOrderMessage, Report, ReportKind};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Action {
    Place,
    Cancel,
    Log,
}

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Command line client for the exchange", long_about = None)]
struct Args {
    /// Address of the exchange server
    #[arg(long, default_value = "127.0.0.1:9001")]
    server: String,
    /// Owner username (compulsory)
    #[arg(long)]
    owner: String,
    /// Action to perform
    #[arg(long, value_enum, default_value_t = Action::Place)]
    action: Action,
    /// Ticker symbol (max 4 chars)
    #[arg(long, default_value = "AAPL")]
    ticker: String,
    /// Order side
    #[arg(long, default_value = "buy", value_parser = parse_side)]
    side: Side,
    /// Order type
    #[arg(long = "type", default_value = "limit", value_parser = parse_order_type)]
    order_type: OrderType,
    /// Limit price
    #[arg(long, default_value_t = 100.0)]
    price: f64,
    /// Quantity or comma-separated list (e.g. 10,20,50)
    #[arg(long, default_value = "10")]
    qty: String,
    /// Id of the order to cancel
    #[arg(long)]
    uuid: Option<String>,
}

fn parse_side(s: &str) -> Result<Side, String> {
    match s.to_lowercase().as_str() {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        _ => Err(format!("invalid side: {s}. Use 'buy' or 'sell'")),
    }
}

fn parse_order_type(s: &str) -> Result<OrderType, String> {
    match s.to_lowercase().as_str() {
        "limit" => Ok(OrderType::Limit),
        "market" => Ok(OrderType::Market),
        _ => Err(format!("invalid order type: {s}. Use 'limit' or 'market'")),
    }
}

fn parse_quantities(input: &str) -> anyhow::Result<Vec<u64>> {
    input
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid quantity '{}'", part.trim()))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("failed to connect to server at {}", args.server))?;
    println!("Connected to {} as '{}'", args.server, args.owner);

    let (read_half, mut write_half) = stream.into_split();
    tokio::spawn(read_reports(read_half));

    match args.action {
        Action::Place => {
            let quantities = parse_quantities(&args.qty)?;
            for qty in quantities {
                let frame = Message::NewOrder(NewOrderMessage {
                    asset: AssetType::Equities,
                    order_type: args.order_type,
                    ticker: Ticker::new(&args.ticker),
                    limit_price: args.price,
                    quantity: qty,
                    side: args.side,
                    username: args.owner.clone(),
                })
                .encode();
                write_half.write_all(&frame).await.context("failed to place order")?;
                println!(
                    "-> Sent {} {:?} order: {} {} @ {:.2}",
                    args.side, args.order_type, args.ticker, qty, args.price
                );
                // Space out batched frames so the server reads one at a time.
                sleep(Duration::from_millis(5)).await;
            }
        }
        Action::Cancel => {
            let Some(uuid) = args.uuid.as_deref() else {
                bail!("--uuid is required for cancellation");
            };
            let parsed = Uuid::parse_str(uuid).context("invalid order id")?;
            let frame = Message::CancelOrder(CancelOrderMessage {
                asset: AssetType::Equities,
                order_id: OrderId::from_bytes(*parsed.as_bytes()),
            })
            .encode();
            write_half.write_all(&frame).await.context("failed to send cancel")?;
            println!("-> Sent cancel request for {uuid}");
        }
        Action::Log => {
            write_half
                .write_all(&Message::LogBook.encode())
                .await
                .context("failed to send log request")?;
            println!("-> Sent log request");
        }
    }

    // Stay connected for execution reports until interrupted.
    println!("\nListening for reports... (press Ctrl+C to exit)");
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Continuously read and print report frames from the server
async fn read_reports(mut stream: OwnedReadHalf) {
    loop {
        let mut frame = vec![0u8; REPORT_HEADER_LEN];
        if stream.read_exact(&mut frame).await.is_err() {
            println!("Connection lost");
            std::process::exit(0);
        }
        let Ok(body_len) = Report::body_len(&frame) else {
            println!("Malformed report header");
            std::process::exit(1);
        };
        frame.resize(REPORT_HEADER_LEN + body_len, 0);
        if body_len > 0 && stream.read_exact(&mut frame[REPORT_HEADER_LEN..]).await.is_err() {
            println!("Connection lost");
            std::process::exit(0);
        }

        match Report::parse(&frame) {
            Ok(report) => print_report(&report),
            Err(err) => println!("Malformed report: {err}"),
        }
    }
}

fn print_report(report: &Report) {
    match report.kind {
        ReportKind::Error => println!("\n[SERVER ERROR] {}", report.err),
        ReportKind::OrderPlaced => println!(
            "\n[PLACED] {} {} | Qty: {} | Price: {:.2} | UUID: {}",
            report.side.to_string().to_uppercase(),
            report.ticker,
            report.quantity,
            report.price,
            report.order_id,
        ),
        ReportKind::Execution => println!(
            "\n[EXECUTION] Match: {} {} | Qty: {} | Price: {:.2} | vs: {} | UUID: {}",
            report.side.to_string().to_uppercase(),
            report.ticker,
            report.quantity,
            report.price,
            report.counterparty,
            report.order_id,
        ),
    }
}
