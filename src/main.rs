fn main() -> anyhow::Result<()> {
    raid_results_lib::run()
}
