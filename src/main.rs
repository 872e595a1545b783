fn main() {
    std::process::exit(syncwatch::run());
}
