//! CLI integration tests.
//!
//! Commands are parsed with clap and dispatched against a SQLite store in a
//! temporary directory; output is captured instead of printed.

#![cfg(feature = "sqlite")]

use clap::Parser;
use esstore::adapters::file_config_adapter::FileConfigAdapter;
use esstore::cli::{self, Cli, Context};
use esstore::domain::error::ShopError;
use esstore::ports::store_port::StorePort;
use std::io::Write;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

struct Shop {
    _dir: TempDir,
    ctx: Context,
}

impl Shop {
    fn open() -> Self {
        let dir = TempDir::new().unwrap();
        let ini = format!(
            "[store]\nbackend = sqlite\n\n[sqlite]\npath = {}\n\n[shop]\nname = Boutique Test\nutc_offset = +00:00\n",
            dir.path().join("shop.db").display()
        );
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        let ctx = Context::from_config(&config).unwrap();
        Self { _dir: dir, ctx }
    }

    fn run(&self, args: &[&str]) -> Result<String, ShopError> {
        let cli = Cli::try_parse_from(std::iter::once("esstore").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        cli::dispatch(&self.ctx, cli.command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn product_id(&self, model: &str) -> String {
        let products = self
            .ctx
            .store
            .list_products(&Default::default())
            .unwrap();
        products
            .iter()
            .find(|p| p.model == model)
            .map(|p| p.id.to_string())
            .unwrap()
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_file() {
        let file = write_temp_ini("[shop]\nname = Boutique Plateau\n");
        let config = cli::load_config(&file.path().to_path_buf()).unwrap();
        use esstore::ports::config_port::ConfigPort;
        assert_eq!(
            config.get_string("shop", "name"),
            Some("Boutique Plateau".into())
        );
    }

    #[test]
    fn load_config_missing_file_fails() {
        let result = cli::load_config(&std::path::PathBuf::from("/nonexistent/esstore.ini"));
        assert!(result.is_err());
    }

    #[test]
    fn bad_utc_offset_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let ini = format!(
            "[sqlite]\npath = {}\n[shop]\nutc_offset = noon\n",
            dir.path().join("shop.db").display()
        );
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        assert!(matches!(
            Context::from_config(&config),
            Err(ShopError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let config = FileConfigAdapter::from_string("[store]\nbackend = mysql\n").unwrap();
        assert!(matches!(
            Context::from_config(&config),
            Err(ShopError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn shop_name_defaults() {
        let dir = TempDir::new().unwrap();
        let ini = format!("[sqlite]\npath = {}\n", dir.path().join("shop.db").display());
        let config = FileConfigAdapter::from_string(&ini).unwrap();
        let ctx = Context::from_config(&config).unwrap();
        assert_eq!(ctx.shop_name, "esstore");
    }
}

mod commands {
    use super::*;

    #[test]
    fn init_db_and_brands() {
        let shop = Shop::open();
        let out = shop.run(&["init-db"]).unwrap();
        assert!(out.contains("8 brand(s)"));

        shop.run(&["brands", "add", "Nokia"]).unwrap();
        let out = shop.run(&["brands", "list"]).unwrap();
        assert!(out.lines().any(|l| l == "Nokia"));

        let err = shop.run(&["brands", "add", "nokia"]).unwrap_err();
        assert!(matches!(err, ShopError::Validation { .. }));
    }

    #[test]
    fn stock_add_list_edit() {
        let shop = Shop::open();
        let out = shop
            .run(&[
                "stock", "add", "--brand", "tecno", "--model", "Spark 20", "--quantity", "3",
                "--price", "85 000", "--description", "128 Go",
            ])
            .unwrap();
        assert!(out.starts_with("Product added:"));

        let out = shop
            .run(&[
                "stock", "add", "--brand", "TECNO", "--model", "spark 20", "--description", "128 Go",
            ])
            .unwrap();
        assert!(out.starts_with("Stock updated:"));

        let out = shop.run(&["stock", "list", "--search", "spark"]).unwrap();
        assert!(out.contains("TECNO Spark 20"));
        assert!(out.contains("1 reference(s), 4 unit(s)"));

        let id = shop.product_id("Spark 20");
        let out = shop.run(&["stock", "edit", &id, "--quantity", "2"]).unwrap();
        assert!(out.contains("2 unit(s)"));
        assert!(out.contains("—"));
    }

    #[test]
    fn stock_edit_keeps_quantity_when_omitted() {
        let shop = Shop::open();
        shop.run(&[
            "stock", "add", "--brand", "ITEL", "--model", "A70", "--quantity", "3",
            "--description", "neuf",
        ])
        .unwrap();
        let id = shop.product_id("A70");

        let out = shop.run(&["stock", "edit", &id, "--price", "60000"]).unwrap();
        assert!(out.contains("3 unit(s)"));
        assert!(out.contains("FCFA"));
    }

    #[test]
    fn deleting_sold_product_is_refused() {
        let shop = Shop::open();
        shop.run(&[
            "stock", "add", "--brand", "ITEL", "--model", "A70", "--quantity", "2", "--price",
            "55000", "--description", "neuf",
        ])
        .unwrap();
        let id = shop.product_id("A70");
        shop.run(&["sales", "record", "--product", &id]).unwrap();

        let err = shop.run(&["stock", "delete", &id]).unwrap_err();
        assert!(matches!(err, ShopError::ProductInUse { ref product } if product == "ITEL A70"));
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&err)),
            format!("{:?}", std::process::ExitCode::from(4))
        );
        assert!(shop.run(&["stock", "list"]).unwrap().contains("ITEL A70"));

        shop.run(&[
            "stock", "add", "--brand", "TECNO", "--model", "Pop 8", "--description", "neuf",
        ])
        .unwrap();
        let unsold = shop.product_id("Pop 8");
        let out = shop.run(&["stock", "delete", &unsold]).unwrap();
        assert!(out.contains("Deleted TECNO Pop 8"));
    }

    #[test]
    fn stock_add_with_unknown_brand_fails() {
        let shop = Shop::open();
        let err = shop
            .run(&["stock", "add", "--brand", "Motorola", "--model", "G54", "--description", "x"])
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound { entity: "brand", .. }));
    }

    #[test]
    fn sale_then_close_day_and_receipt() {
        let shop = Shop::open();
        shop.run(&[
            "stock", "add", "--brand", "ITEL", "--model", "A70", "--quantity", "2", "--price",
            "55000", "--description", "neuf",
        ])
        .unwrap();
        let id = shop.product_id("A70");

        let out = shop.run(&["sales", "record", "--product", &id, "--quantity", "2"]).unwrap();
        assert!(out.contains("ITEL A70 x2"));

        let err = shop
            .run(&["sales", "record", "--product", &id])
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { .. }));

        let out = shop.run(&["sales", "list"]).unwrap();
        assert!(out.contains("1 sale(s)"));

        let out = shop.run(&["sales", "close-day", "--preview"]).unwrap();
        assert!(out.contains("not recorded"));
        assert!(shop.run(&["receipt", "list"]).unwrap().contains("0 day(s)"));

        let out = shop.run(&["sales", "close-day"]).unwrap();
        assert!(out.contains("1 sale(s), 0 trade(s)"));

        let out = shop.run(&["receipt", "show"]).unwrap();
        assert!(out.contains("variance"));
        assert!(out.contains("0 FCFA"));

        let out = shop.run(&["receipt", "list"]).unwrap();
        assert!(out.contains("1 day(s)"));

        let err = shop.run(&["stock", "delete", &id]).unwrap_err();
        assert!(matches!(err, ShopError::ProductInUse { .. }));
    }

    #[test]
    fn trade_and_buyback() {
        let shop = Shop::open();
        shop.run(&[
            "stock", "add", "--brand", "SAMSUNG", "--model", "Galaxy A25", "--price", "150000",
            "--description", "neuf",
        ])
        .unwrap();
        let id = shop.product_id("Galaxy A25");

        let out = shop
            .run(&[
                "trade", "record", "--client-brand", "TECNO", "--client-model", "Camon 20",
                "--client-value", "60000", "--product", &id, "--complement", "100000",
            ])
            .unwrap();
        assert!(out.contains("TECNO Camon 20"));

        let out = shop.run(&["trade", "list"]).unwrap();
        assert!(out.contains("1 trade(s)"));

        let out = shop
            .run(&[
                "buyback", "record", "--client", "Awa", "--brand", "infinix", "--model", "Hot 30",
                "--price", "40000",
            ])
            .unwrap();
        assert!(out.contains("Added to stock"));

        let out = shop
            .run(&["buyback", "record", "--brand", "Nokia", "--model", "3310", "--price", "5000"])
            .unwrap();
        assert!(out.contains("not added to stock"));

        let out = shop.run(&["buyback", "list"]).unwrap();
        assert!(out.contains("2 buyback(s)"));
    }

    #[test]
    fn finance_export_writes_csv() {
        let shop = Shop::open();
        shop.run(&[
            "stock", "add", "--brand", "ITEL", "--model", "A70", "--price", "55000",
            "--description", "neuf",
        ])
        .unwrap();
        let id = shop.product_id("A70");
        shop.run(&["sales", "record", "--product", &id]).unwrap();

        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("finance.csv");
        let out = shop
            .run(&["finance", "--period", "jour", "--export", csv.to_str().unwrap()])
            .unwrap();
        assert!(out.starts_with("Aujourd'hui"));
        assert!(out.contains("Exported to"));

        let content = std::fs::read_to_string(&csv).unwrap();
        let last = content.lines().last().unwrap();
        assert_eq!(last, "TOTAL,55000,0,0,55000");
    }

    #[test]
    fn finance_rejects_bounds_without_custom() {
        let shop = Shop::open();
        let err = shop
            .run(&["finance", "--period", "week", "--start", "2026-10-01"])
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation { .. }));
    }

    #[test]
    fn dashboard_prints_sections() {
        let shop = Shop::open();
        let out = shop.run(&["dashboard"]).unwrap();
        assert!(out.starts_with("Boutique Test - "));
        assert!(out.contains("Last 7 days"));
        assert!(out.contains("nothing recorded yet"));
    }
}
