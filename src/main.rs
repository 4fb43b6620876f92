use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    let args = beancount_import_ledger::args::parse();
    beancount_import_ledger::cli::main(args)
}
