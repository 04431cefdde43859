fn main() {
    automation_hub_lib::run()
}
