fn main() -> anyhow::Result<()> {
    odata_client::run()
}
