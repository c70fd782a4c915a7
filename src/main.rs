fn main() -> anyhow::Result<()> {
    home_vr::start()
}
