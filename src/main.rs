fn main() -> anyhow::Result<()> {
    gesture_composer_lib::run()
}
