/// Synthetic ITCH 5.0 feed generator
///
/// Creates realistic order flow and either writes the packed stream to a file or
/// publishes it as datagrams on both multicast feeds, optionally dropping every
/// Nth datagram on feed A so the handler has gaps to fill from feed B.
///
/// ```bash
/// cargo run --example feed_generator -- file /tmp/itch.bin --count 10000
/// cargo run --example feed_generator -- multicast --drop-every 10
/// ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use itch_feed_handler::decoder::{
    AddOrder, AddOrderWithMpid, OrderCancel, OrderDelete, OrderExecuted, OrderExecutedWithPrice,
    OrderReplace, StockDirectory, SystemEvent,
};
use itch_feed_handler::{Header, Message, Mpid, Price, Symbol};
use rand::rngs::ThreadRng;
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const SYMBOLS: [&str; 4] = ["AAPL", "MSFT", "NVDA", "ZVZZT"];
const MPIDS: [&str; 3] = ["GSCO", "MSCO", "JPMS"];
/// 09:30:00 in nanoseconds since midnight
const MARKET_OPEN_NS: u64 = 34_200_000_000_000;

#[derive(Parser)]
#[command(name = "feed_generator", about = "Synthetic ITCH 5.0 feed generator")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Sequenced messages to generate
    #[arg(short, long, global = true, default_value_t = 10000)]
    count: usize,

    /// Messages packed into each datagram
    #[arg(long, global = true, default_value_t = 4)]
    per_datagram: usize,
}

#[derive(Subcommand)]
enum Mode {
    /// Write the packed stream to a file
    File { path: PathBuf },
    /// Publish on feeds A and B
    Multicast(MulticastArgs),
}

#[derive(Args)]
struct MulticastArgs {
    #[arg(long, default_value_t = Ipv4Addr::new(239, 0, 0, 1))]
    group: Ipv4Addr,

    #[arg(long, default_value_t = 5007)]
    port_a: u16,

    #[arg(long, default_value_t = 5008)]
    port_b: u16,

    /// Drop every Nth datagram on feed A; 0 disables
    #[arg(long, default_value_t = 0)]
    drop_every: usize,

    /// Pause between datagrams, in microseconds
    #[arg(long, default_value_t = 100)]
    interval_us: u64,
}

/// Stateful order-flow generator; tracking numbers run 1..=65535 and wrap
struct FlowGenerator {
    rng: ThreadRng,
    tracking: u16,
    timestamp: u64,
    next_order_ref: u64,
    live_orders: Vec<(u64, u16)>,
    next_match: u64,
}

impl FlowGenerator {
    fn new() -> Self {
        FlowGenerator {
            rng: rand::thread_rng(),
            tracking: 0,
            timestamp: MARKET_OPEN_NS,
            next_order_ref: 1000,
            live_orders: Vec::new(),
            next_match: 1,
        }
    }

    fn header(&mut self, stock_locate: u16) -> Header {
        self.tracking = if self.tracking == u16::MAX { 1 } else { self.tracking + 1 };
        self.timestamp += self.rng.gen_range(1_000..50_000);
        Header { stock_locate, tracking_number: self.tracking, timestamp: self.timestamp }
    }

    fn price(&mut self) -> Price {
        let px = 100.0 + self.rng.gen_range(-0.5..0.5);
        Price::from_decimal(px).unwrap_or(Price::from_raw(1_000_000))
    }

    /// Start-of-day event; unsequenced
    fn system_event(&self, event_code: u8) -> Message {
        Message::SystemEvent(SystemEvent {
            header: Header { stock_locate: 0, tracking_number: 0, timestamp: self.timestamp },
            event_code,
        })
    }

    fn directory(&mut self, locate: u16) -> Message {
        Message::StockDirectory(StockDirectory {
            header: self.header(locate),
            stock: Symbol::new(SYMBOLS[usize::from(locate) - 1]),
            market_category: b'Q',
            financial_status_indicator: b'N',
            round_lot_size: 100,
            round_lots_only: b'N',
            issue_classification: b'C',
            issue_sub_type: *b"Z ",
            authenticity: b'P',
            short_sale_threshold_indicator: b'N',
            ipo_flag: b'N',
            luld_reference_price_tier: b'1',
            etp_flag: b'N',
            etp_leverage_factor: 0,
            inverse_indicator: b'N',
        })
    }

    fn next_message(&mut self) -> Message {
        let choice = if self.live_orders.is_empty() { 0 } else { self.rng.gen_range(0..10) };
        match choice {
            0..=3 => self.add_order(false),
            4 => self.add_order(true),
            5 => self.execute(false),
            6 => self.execute(true),
            7 => self.cancel(),
            8 => self.replace(),
            _ => self.delete(),
        }
    }

    fn add_order(&mut self, attributed: bool) -> Message {
        let locate = self.rng.gen_range(1..=SYMBOLS.len() as u16);
        let order_ref = self.next_order_ref;
        self.next_order_ref += 1;
        self.live_orders.push((order_ref, locate));

        let header = self.header(locate);
        let buy_sell_indicator = if self.rng.gen_bool(0.5) { b'B' } else { b'S' };
        let shares = self.rng.gen_range(1..10) * 100;
        let stock = Symbol::new(SYMBOLS[usize::from(locate) - 1]);
        let price = self.price();
        if attributed {
            let attribution = Mpid::new(MPIDS[self.rng.gen_range(0..MPIDS.len())]);
            Message::AddOrderWithMpid(AddOrderWithMpid {
                header,
                order_reference_number: order_ref,
                buy_sell_indicator,
                shares,
                stock,
                price,
                attribution,
            })
        } else {
            Message::AddOrder(AddOrder {
                header,
                order_reference_number: order_ref,
                buy_sell_indicator,
                shares,
                stock,
                price,
            })
        }
    }

    fn pick_order(&mut self) -> (u64, u16) {
        self.live_orders[self.rng.gen_range(0..self.live_orders.len())]
    }

    fn execute(&mut self, with_price: bool) -> Message {
        let (order_ref, locate) = self.pick_order();
        let header = self.header(locate);
        let executed_shares = self.rng.gen_range(1..=100);
        let match_number = self.next_match;
        self.next_match += 1;
        if with_price {
            let execution_price = self.price();
            Message::OrderExecutedWithPrice(OrderExecutedWithPrice {
                header,
                order_reference_number: order_ref,
                executed_shares,
                match_number,
                printable: b'Y',
                execution_price,
            })
        } else {
            Message::OrderExecuted(OrderExecuted {
                header,
                order_reference_number: order_ref,
                executed_shares,
                match_number,
            })
        }
    }

    fn cancel(&mut self) -> Message {
        let (order_ref, locate) = self.pick_order();
        let canceled_shares = self.rng.gen_range(1..=100);
        Message::OrderCancel(OrderCancel {
            header: self.header(locate),
            order_reference_number: order_ref,
            canceled_shares,
        })
    }

    fn replace(&mut self) -> Message {
        let idx = self.rng.gen_range(0..self.live_orders.len());
        let (original, locate) = self.live_orders[idx];
        let new_ref = self.next_order_ref;
        self.next_order_ref += 1;
        self.live_orders[idx] = (new_ref, locate);

        let header = self.header(locate);
        let shares = self.rng.gen_range(1..10) * 100;
        let price = self.price();
        Message::OrderReplace(OrderReplace {
            header,
            original_order_reference_number: original,
            new_order_reference_number: new_ref,
            shares,
            price,
        })
    }

    fn delete(&mut self) -> Message {
        let idx = self.rng.gen_range(0..self.live_orders.len());
        let (order_ref, locate) = self.live_orders.swap_remove(idx);
        Message::OrderDelete(OrderDelete {
            header: self.header(locate),
            order_reference_number: order_ref,
        })
    }
}

/// Start-of-day preamble followed by `count` order-flow messages, packed into datagrams
fn generate(count: usize, per_datagram: usize) -> Vec<Vec<u8>> {
    let mut generator = FlowGenerator::new();
    let mut messages = vec![generator.system_event(b'O')];
    for locate in 1..=SYMBOLS.len() as u16 {
        messages.push(generator.directory(locate));
    }
    messages.extend((0..count).map(|_| generator.next_message()));

    messages
        .chunks(per_datagram.max(1))
        .map(|chunk| {
            let mut datagram = Vec::new();
            for msg in chunk {
                msg.encode_into(&mut datagram);
            }
            datagram
        })
        .collect()
}

fn write_file(path: &Path, datagrams: &[Vec<u8>]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let mut bytes = 0;
    for d in datagrams {
        out.write_all(d)?;
        bytes += d.len();
    }
    out.flush()?;
    println!("Wrote {} bytes to {}", bytes, path.display());
    Ok(())
}

fn publish(args: &MulticastArgs, datagrams: &[Vec<u8>]) -> Result<()> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_multicast_ttl_v4(1)?;
    let feed_a = SocketAddrV4::new(args.group, args.port_a);
    let feed_b = SocketAddrV4::new(args.group, args.port_b);
    let interval = Duration::from_micros(args.interval_us);

    let mut dropped = 0;
    for (i, d) in datagrams.iter().enumerate() {
        if args.drop_every > 0 && (i + 1) % args.drop_every == 0 {
            dropped += 1;
        } else {
            socket.send_to(d, feed_a)?;
        }
        socket.send_to(d, feed_b)?;

        if i % 1000 == 0 && i > 0 {
            println!("Sent {} datagrams", i);
        }
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    println!(
        "Published {} datagrams to {} (A) and {} (B), {} dropped on A",
        datagrams.len(),
        feed_a,
        feed_b,
        dropped
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let datagrams = generate(cli.count, cli.per_datagram);
    println!("Generated {} messages in {} datagrams", cli.count, datagrams.len());

    match &cli.mode {
        Mode::File { path } => write_file(path, &datagrams),
        Mode::Multicast(args) => publish(args, &datagrams),
    }
}
