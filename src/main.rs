fn main() -> anyhow::Result<()> {
    eventfx::run()
}
