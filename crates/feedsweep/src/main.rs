fn main() -> anyhow::Result<()> {
    feedsweep::cli::run()
}
