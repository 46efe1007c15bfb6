//! CLI definition and dispatch.
//!
//! Commands write their report to the given writer (stdout in the binary) and
//! return a [`ShopError`] on failure; [`run`] maps errors to exit codes.

use chrono::{Days, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use uuid::Uuid;

use crate::adapters::csv_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::open_store;
use crate::domain::brand::{add_brand, resolve_brand};
use crate::domain::buyback::{list_buybacks, record_buyback, BuybackForm};
use crate::domain::clock::{parse_utc_offset, ShopClock};
use crate::domain::closing::{
    close_day, closing_summary, list_receipts, reconcile, record_receipt,
};
use crate::domain::dashboard::load_dashboard;
use crate::domain::error::ShopError;
use crate::domain::finance::finance_report;
use crate::domain::money::{format_fcfa, format_optional_fcfa, parse_amount, Amount};
use crate::domain::period::Period;
use crate::domain::sales::{list_sales, record_sale, SaleForm};
use crate::domain::stock::{
    delete_product, edit_product, list_stock, receive_stock, sellable_products, IntakeOutcome,
    Product, StockIntake, StockView,
};
use crate::domain::trade::{list_trades, record_trade, TradeForm};
use crate::logging::{init_logging, LogSettings};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::store_port::StorePort;

const DEFAULT_SHOP_NAME: &str = "esstore";
const DEFAULT_UTC_OFFSET: &str = "+00:00";
const RECEIPT_LOOKBACK_DAYS: u64 = 30;

fn amount_arg(s: &str) -> Result<Amount, String> {
    parse_amount("amount", s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "esstore", about = "Back office for a phone shop", version)]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "esstore.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the local schema and seed default brands
    InitDb,
    /// Today's figures, the last 7 days and recent activity
    Dashboard,
    /// Phone brands
    Brands {
        #[command(subcommand)]
        action: BrandsCommand,
    },
    /// Inventory
    Stock {
        #[command(subcommand)]
        action: StockCommand,
    },
    /// Sales and daily closing
    Sales {
        #[command(subcommand)]
        action: SalesCommand,
    },
    /// Trade-ins (troc)
    Trade {
        #[command(subcommand)]
        action: TradeCommand,
    },
    /// Buybacks (rachat)
    Buyback {
        #[command(subcommand)]
        action: BuybackCommand,
    },
    /// Daily receipts
    Receipt {
        #[command(subcommand)]
        action: ReceiptCommand,
    },
    /// Revenue over a period
    Finance(FinanceArgs),
}

#[derive(Subcommand, Debug)]
pub enum BrandsCommand {
    List,
    Add { name: String },
}

#[derive(Subcommand, Debug)]
pub enum StockCommand {
    List {
        #[arg(long)]
        brand: Option<String>,
        /// Case-insensitive match on model or brand
        #[arg(long)]
        search: Option<String>,
        /// Only products with units left, by model
        #[arg(long)]
        in_stock: bool,
    },
    /// Receive units, creating the product if needed
    Add {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        model: String,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
        #[arg(long, value_parser = amount_arg)]
        price: Option<Amount>,
        #[arg(long)]
        description: String,
    },
    /// Correct quantity and price; omitting --price clears it
    Edit {
        id: Uuid,
        /// Left unchanged when omitted
        #[arg(long)]
        quantity: Option<i64>,
        #[arg(long, value_parser = amount_arg)]
        price: Option<Amount>,
    },
    Delete { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum SalesCommand {
    List {
        /// Only this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Record {
        #[arg(long)]
        product: Uuid,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
        /// Defaults to the product's price
        #[arg(long, value_parser = amount_arg)]
        price: Option<Amount>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record today's receipts from sales and trade complements
    CloseDay {
        /// Show the totals without recording them
        #[arg(long)]
        preview: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TradeCommand {
    List,
    Record(TradeArgs),
}

#[derive(Args, Debug)]
pub struct TradeArgs {
    #[arg(long)]
    pub client_brand: String,
    #[arg(long)]
    pub client_model: String,
    /// Estimated value of the customer's phone
    #[arg(long, value_parser = amount_arg)]
    pub client_value: Option<Amount>,
    #[arg(long)]
    pub client_description: Option<String>,
    /// Shop product handed over
    #[arg(long)]
    pub product: Uuid,
    #[arg(long, value_parser = amount_arg)]
    pub shop_price: Option<Amount>,
    #[arg(long)]
    pub shop_description: Option<String>,
    /// Cash paid by the customer
    #[arg(long, value_parser = amount_arg)]
    pub complement: Option<Amount>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum BuybackCommand {
    List,
    Record {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        brand: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = amount_arg)]
        price: Amount,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReceiptCommand {
    /// Recorded against computed receipts for a day
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record a counted amount, overwriting the day's receipt
    Record {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = amount_arg)]
        amount: Amount,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Args, Debug)]
pub struct FinanceArgs {
    /// day, week, month, quarter, semester, year or custom
    #[arg(long, default_value = "day")]
    pub period: Period,
    #[arg(long)]
    pub start: Option<NaiveDate>,
    #[arg(long)]
    pub end: Option<NaiveDate>,
    /// Write the daily breakdown to a CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Everything a command needs.
pub struct Context {
    pub store: Box<dyn StorePort>,
    pub clock: ShopClock,
    pub shop_name: String,
}

impl Context {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ShopError> {
        let offset = parse_utc_offset(
            &config
                .get_non_empty("shop", "utc_offset")
                .unwrap_or_else(|| DEFAULT_UTC_OFFSET.into()),
        )?;
        Ok(Self {
            store: open_store(config)?,
            clock: ShopClock::new(offset),
            shop_name: config
                .get_non_empty("shop", "name")
                .unwrap_or_else(|| DEFAULT_SHOP_NAME.into()),
        })
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match LogSettings::from_config(Some(&config as &dyn ConfigPort)) {
        Ok(settings) => init_logging(&settings),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    }

    let result = Context::from_config(&config).and_then(|ctx| {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        dispatch(&ctx, cli.command, &mut out)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn dispatch(ctx: &Context, command: Command, out: &mut dyn Write) -> Result<(), ShopError> {
    match command {
        Command::InitDb => run_init_db(ctx, out),
        Command::Dashboard => run_dashboard(ctx, out),
        Command::Brands { action } => run_brands(ctx, action, out),
        Command::Stock { action } => run_stock(ctx, action, out),
        Command::Sales { action } => run_sales(ctx, action, out),
        Command::Trade { action } => run_trade(ctx, action, out),
        Command::Buyback { action } => run_buyback(ctx, action, out),
        Command::Receipt { action } => run_receipt(ctx, action, out),
        Command::Finance(args) => run_finance(ctx, args, out),
    }
}

fn run_init_db(ctx: &Context, out: &mut dyn Write) -> Result<(), ShopError> {
    ctx.store.initialize()?;
    let brands = ctx.store.list_brands()?;
    writeln!(out, "Store ready: {} brand(s) available.", brands.len())?;
    Ok(())
}

fn run_dashboard(ctx: &Context, out: &mut dyn Write) -> Result<(), ShopError> {
    let dash = load_dashboard(ctx.store.as_ref(), &ctx.clock)?;
    let stats = &dash.stats;

    writeln!(out, "{} - {}", ctx.shop_name, ctx.clock.today().format("%d/%m/%Y"))?;
    writeln!(out)?;
    writeln!(out, "  References in stock   {}", stats.references)?;
    writeln!(out, "  Units in stock        {}", stats.total_units)?;
    writeln!(
        out,
        "  Sales today           {} ({})",
        stats.sales_today,
        format_fcfa(stats.revenue_today)
    )?;
    writeln!(out, "  Trades today          {}", stats.trades_today)?;
    writeln!(out, "  Recorded receipt      {}", format_fcfa(stats.receipt_today))?;

    writeln!(out)?;
    writeln!(out, "Last 7 days (sales / trades)")?;
    for point in &dash.activity {
        writeln!(
            out,
            "  {}  {:>3} {:<20} {:>3} {}",
            point.label(),
            point.sales,
            "#".repeat(point.sales.min(20)),
            point.trades,
            "+".repeat(point.trades.min(20)),
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Recent activity")?;
    if dash.recent.is_empty() {
        writeln!(out, "  nothing recorded yet")?;
    }
    for item in &dash.recent {
        writeln!(
            out,
            "  {}  {:<40} {:>16}",
            item.created_at
                .with_timezone(&ctx.clock.offset())
                .format("%d/%m %H:%M"),
            item.description,
            format_optional_fcfa(item.amount)
        )?;
    }
    Ok(())
}

fn run_brands(ctx: &Context, action: BrandsCommand, out: &mut dyn Write) -> Result<(), ShopError> {
    match action {
        BrandsCommand::List => {
            for brand in ctx.store.list_brands()? {
                writeln!(out, "{}", brand.name)?;
            }
        }
        BrandsCommand::Add { name } => {
            let brand = add_brand(ctx.store.as_ref(), &name)?;
            writeln!(out, "Brand {} added.", brand.name)?;
        }
    }
    Ok(())
}

fn write_products(out: &mut dyn Write, products: &[Product]) -> Result<(), ShopError> {
    for p in products {
        writeln!(
            out,
            "{}  {:<32} {:>4}  {:>16}  {}",
            p.id,
            p.label(),
            p.quantity,
            format_optional_fcfa(p.unit_price),
            p.description.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}

fn run_stock(ctx: &Context, action: StockCommand, out: &mut dyn Write) -> Result<(), ShopError> {
    let store = ctx.store.as_ref();
    match action {
        StockCommand::List {
            brand,
            search,
            in_stock,
        } => {
            let brand_id = match brand {
                Some(name) => Some(resolve_brand(store, &name)?.id),
                None => None,
            };
            let view = if in_stock {
                let mut products = sellable_products(store, brand_id)?;
                if let Some(q) = search.as_deref() {
                    products.retain(|p| p.matches_search(q));
                }
                StockView::from_products(products)?
            } else {
                list_stock(store, brand_id, search.as_deref())?
            };
            write_products(out, &view.products)?;
            writeln!(
                out,
                "{} reference(s), {} unit(s), valued at {}",
                view.references,
                view.total_units,
                format_fcfa(view.valuation)
            )?;
        }
        StockCommand::Add {
            brand,
            model,
            quantity,
            price,
            description,
        } => {
            let brand = resolve_brand(store, &brand)?;
            let outcome = receive_stock(
                store,
                &ctx.clock,
                &StockIntake {
                    brand_id: brand.id,
                    model,
                    quantity,
                    unit_price: price,
                    description,
                },
            )?;
            match outcome {
                IntakeOutcome::Created { product_id } => {
                    writeln!(out, "Product added: {product_id}")?
                }
                IntakeOutcome::Restocked { product_id } => {
                    writeln!(out, "Stock updated: {product_id}")?
                }
            }
        }
        StockCommand::Edit {
            id,
            quantity,
            price,
        } => {
            let product = edit_product(store, &ctx.clock, id, quantity, price)?;
            writeln!(
                out,
                "{}: {} unit(s) at {}",
                product.label(),
                product.quantity,
                format_optional_fcfa(product.unit_price)
            )?;
        }
        StockCommand::Delete { id } => {
            let product = delete_product(store, id)?;
            writeln!(out, "Deleted {}.", product.label())?;
        }
    }
    Ok(())
}

fn run_sales(ctx: &Context, action: SalesCommand, out: &mut dyn Write) -> Result<(), ShopError> {
    let store = ctx.store.as_ref();
    match action {
        SalesCommand::List { date } => {
            let view = list_sales(store, &ctx.clock, date)?;
            for sale in &view.sales {
                writeln!(
                    out,
                    "{}  {:<32} x{:<3} {:>16}",
                    sale.created_at
                        .with_timezone(&ctx.clock.offset())
                        .format("%d/%m/%Y %H:%M"),
                    sale.product_label.as_deref().unwrap_or("?"),
                    sale.quantity,
                    format_fcfa(sale.total_price)
                )?;
            }
            writeln!(
                out,
                "{} sale(s), revenue {}",
                view.sales.len(),
                format_fcfa(view.revenue)
            )?;
        }
        SalesCommand::Record {
            product,
            quantity,
            price,
            notes,
        } => {
            let sale = record_sale(
                store,
                &ctx.clock,
                &SaleForm {
                    product_id: product,
                    quantity,
                    unit_price: price,
                    notes,
                },
            )?;
            writeln!(
                out,
                "Sale recorded: {} x{} = {}",
                sale.product_label.as_deref().unwrap_or("?"),
                sale.quantity,
                format_fcfa(sale.total_price)
            )?;
        }
        SalesCommand::CloseDay { preview: true } => {
            let summary = closing_summary(store, &ctx.clock, ctx.clock.today())?;
            writeln!(
                out,
                "Day {} (not recorded): {} ({} sale(s), {} trade(s))",
                summary.date.format("%d/%m/%Y"),
                format_fcfa(summary.total()),
                summary.sales_count,
                summary.trades_count
            )?;
        }
        SalesCommand::CloseDay { preview: false } => {
            let (summary, receipt) = close_day(store, &ctx.clock)?;
            writeln!(
                out,
                "Day {} closed: {} ({} sale(s), {} trade(s))",
                receipt.receipt_date.format("%d/%m/%Y"),
                format_fcfa(receipt.total_amount),
                summary.sales_count,
                summary.trades_count
            )?;
        }
    }
    Ok(())
}

fn run_trade(ctx: &Context, action: TradeCommand, out: &mut dyn Write) -> Result<(), ShopError> {
    let store = ctx.store.as_ref();
    match action {
        TradeCommand::List => {
            let view = list_trades(store)?;
            for t in &view.trades {
                writeln!(
                    out,
                    "{}  {:<24} -> {:<28} complement {:>14}  gain {:>14}",
                    t.created_at
                        .with_timezone(&ctx.clock.offset())
                        .format("%d/%m/%Y"),
                    t.client_phone_label(),
                    t.shop_product_label.as_deref().unwrap_or("?"),
                    format_fcfa(t.client_complement),
                    format_fcfa(t.trade_gain)
                )?;
            }
            writeln!(
                out,
                "{} trade(s), total gain {}",
                view.trades.len(),
                format_fcfa(view.total_gain)
            )?;
        }
        TradeCommand::Record(args) => {
            let trade = record_trade(
                store,
                &ctx.clock,
                &TradeForm {
                    client_brand: args.client_brand,
                    client_model: args.client_model,
                    client_value: args.client_value,
                    client_description: args.client_description,
                    shop_product_id: Some(args.product),
                    shop_price: args.shop_price,
                    shop_description: args.shop_description,
                    complement: args.complement,
                    notes: args.notes,
                },
            )?;
            writeln!(
                out,
                "Trade recorded: {} for {}, gain {}",
                trade.client_phone_label(),
                trade.shop_product_label.as_deref().unwrap_or("?"),
                format_fcfa(trade.trade_gain)
            )?;
        }
    }
    Ok(())
}

fn run_buyback(
    ctx: &Context,
    action: BuybackCommand,
    out: &mut dyn Write,
) -> Result<(), ShopError> {
    let store = ctx.store.as_ref();
    match action {
        BuybackCommand::List => {
            let view = list_buybacks(store)?;
            for b in &view.buybacks {
                writeln!(
                    out,
                    "{}  {:<28} {:<20} {:>16}",
                    b.created_at
                        .with_timezone(&ctx.clock.offset())
                        .format("%d/%m/%Y"),
                    format!("{} {}", b.brand_name, b.model),
                    b.client_name.as_deref().unwrap_or("—"),
                    format_fcfa(b.purchase_price)
                )?;
            }
            writeln!(
                out,
                "{} buyback(s), total spent {}",
                view.buybacks.len(),
                format_fcfa(view.total_spent)
            )?;
        }
        BuybackCommand::Record {
            client,
            brand,
            model,
            description,
            price,
            notes,
        } => {
            let outcome = record_buyback(
                store,
                &ctx.clock,
                &BuybackForm {
                    client_name: client,
                    brand_name: brand,
                    model,
                    description,
                    purchase_price: Some(price),
                    notes,
                },
            )?;
            let b = &outcome.buyback;
            writeln!(
                out,
                "Buyback recorded: {} {} for {}",
                b.brand_name,
                b.model,
                format_fcfa(b.purchase_price)
            )?;
            match outcome.stocked_product {
                Some(id) => writeln!(out, "Added to stock: {id}")?,
                None => writeln!(out, "Brand unknown: phone not added to stock.")?,
            }
        }
    }
    Ok(())
}

fn run_receipt(
    ctx: &Context,
    action: ReceiptCommand,
    out: &mut dyn Write,
) -> Result<(), ShopError> {
    let store = ctx.store.as_ref();
    match action {
        ReceiptCommand::Show { date } => {
            let rec = reconcile(store, &ctx.clock, date.unwrap_or_else(|| ctx.clock.today()))?;
            writeln!(out, "Receipts for {}", rec.date.format("%d/%m/%Y"))?;
            writeln!(out, "  recorded  {}", format_optional_fcfa(rec.recorded))?;
            writeln!(out, "  computed  {}", format_fcfa(rec.computed))?;
            writeln!(out, "  variance  {}", format_optional_fcfa(rec.variance()))?;
        }
        ReceiptCommand::Record {
            date,
            amount,
            notes,
        } => {
            let receipt =
                record_receipt(store, &ctx.clock, date, Some(amount), notes.as_deref())?;
            writeln!(
                out,
                "Receipt for {} set to {}",
                receipt.receipt_date.format("%d/%m/%Y"),
                format_fcfa(receipt.total_amount)
            )?;
        }
        ReceiptCommand::List { from, to } => {
            let last = to.unwrap_or_else(|| ctx.clock.today());
            let first = from.unwrap_or_else(|| {
                last.checked_sub_days(Days::new(RECEIPT_LOOKBACK_DAYS))
                    .unwrap_or(last)
            });
            let receipts = list_receipts(store, first, last)?;
            for r in &receipts {
                writeln!(
                    out,
                    "{}  {:>16}  {}",
                    r.receipt_date.format("%d/%m/%Y"),
                    format_fcfa(r.total_amount),
                    r.notes.as_deref().unwrap_or("")
                )?;
            }
            let total: Amount = receipts.iter().map(|r| r.total_amount).sum();
            writeln!(out, "{} day(s), {}", receipts.len(), format_fcfa(total))?;
        }
    }
    Ok(())
}

/// Attach `--start` / `--end` to a custom period; they mean nothing otherwise.
pub fn resolve_period(args: &FinanceArgs) -> Result<Period, ShopError> {
    match args.period {
        Period::Custom { .. } => Ok(Period::custom(args.start, args.end)),
        _ if args.start.is_some() || args.end.is_some() => Err(ShopError::validation(
            "period",
            "--start and --end require --period custom",
        )),
        period => Ok(period),
    }
}

fn run_finance(ctx: &Context, args: FinanceArgs, out: &mut dyn Write) -> Result<(), ShopError> {
    let period = resolve_period(&args)?;
    let report = finance_report(ctx.store.as_ref(), &ctx.clock, period)?;

    writeln!(
        out,
        "{} ({} – {})",
        report.period.label(),
        report.range.first_day().format("%d/%m/%Y"),
        report.range.last_day().format("%d/%m/%Y")
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "{:<12} {:>16} {:>16} {:>16} {:>16}",
        "Date", "Sales", "Complements", "Trade gains", "Total"
    )?;
    for e in &report.entries {
        writeln!(
            out,
            "{:<12} {:>16} {:>16} {:>16} {:>16}",
            e.date.format("%d/%m/%Y").to_string(),
            format_fcfa(e.sales),
            format_fcfa(e.trade_complements),
            format_fcfa(e.trade_gains),
            format_fcfa(e.total())
        )?;
    }
    let t = &report.totals;
    writeln!(
        out,
        "{:<12} {:>16} {:>16} {:>16} {:>16}",
        "TOTAL",
        format_fcfa(t.sales),
        format_fcfa(t.complements),
        format_fcfa(t.gains),
        format_fcfa(t.grand_total())
    )?;

    writeln!(out)?;
    writeln!(out, "Movements ({})", report.movements.len())?;
    for m in &report.movements {
        writeln!(
            out,
            "  {}  {:<6} {:<32} {:>16}",
            m.created_at
                .with_timezone(&ctx.clock.offset())
                .format("%d/%m %H:%M"),
            m.kind.to_string(),
            m.description,
            format_fcfa(m.amount)
        )?;
    }

    let today = &report.today;
    writeln!(out)?;
    writeln!(
        out,
        "Today: recorded {}, computed {}",
        format_optional_fcfa(today.recorded),
        format_fcfa(today.computed)
    )?;

    if let Some(path) = args.export {
        let path = path.display().to_string();
        CsvReportAdapter.write_finance(&report, &path)?;
        writeln!(out, "Exported to {path}")?;
    }
    Ok(())
}
