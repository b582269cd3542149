fn main() -> anyhow::Result<()> {
    isobench::cli::run()
}
